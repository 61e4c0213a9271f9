//! Chat command parser.
//!
//! Recognizes the `alias` and `email` command groups after the configured
//! prefix, e.g. `>alias add me@example.com` or `>email list 2`.

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Bare `alias`, or an unknown `alias` subcommand.
    AliasHelp,
    /// `alias list`
    AliasList,
    /// `alias add <address>`
    AliasAdd(String),
    /// `alias remove <address>`
    AliasRemove(String),
    /// Bare `email`, or an unknown `email` subcommand.
    EmailHelp,
    /// `email list [page]`
    EmailList(i64),
    /// `email view <id>`
    EmailView(i64),
    /// Recognized command with missing or malformed arguments.
    Invalid(String),
}

/// Parse a chat line. Returns `None` if the line is not one of our commands.
pub fn parse_command(prefix: &str, line: &str) -> Option<Command> {
    let rest = line.trim().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();

    let command = match words.next()? {
        "alias" => match words.next() {
            None => Command::AliasHelp,
            Some("list") => Command::AliasList,
            Some("add") => match words.next() {
                Some(address) => Command::AliasAdd(address.to_string()),
                None => Command::Invalid(usage(prefix, "alias add <email@domain.com>")),
            },
            Some("remove") => match words.next() {
                Some(address) => Command::AliasRemove(address.to_string()),
                None => Command::Invalid(usage(prefix, "alias remove <email@domain.com>")),
            },
            Some(_) => Command::AliasHelp,
        },
        "email" => match words.next() {
            None => Command::EmailHelp,
            Some("list") => match words.next() {
                None => Command::EmailList(1),
                Some(page) => match page.parse::<i64>() {
                    Ok(page) => Command::EmailList(page),
                    Err(_) => Command::Invalid(format!("`{page}` is not a valid page number")),
                },
            },
            Some("view") => match words.next() {
                None => Command::Invalid(usage(prefix, "email view <id>")),
                Some(id) => match id.parse::<i64>() {
                    Ok(id) => Command::EmailView(id),
                    Err(_) => Command::Invalid(format!("`{id}` is not a valid email id")),
                },
            },
            Some(_) => Command::EmailHelp,
        },
        _ => return None,
    };

    Some(command)
}

fn usage(prefix: &str, syntax: &str) -> String {
    format!("Usage: `{prefix}{syntax}`")
}

/// Subcommand list for the `alias` group.
pub fn alias_help(prefix: &str) -> String {
    format!(
        "```\nAvailable subcommands\n{p}alias list\n{p}alias add <email@domain.com>\n{p}alias remove <email@domain.com>\n```",
        p = prefix
    )
}

/// Subcommand list for the `email` group.
pub fn email_help(prefix: &str) -> String {
    format!(
        "```\nAvailable subcommands\n{p}email list [page]\n{p}email view <id>\n```",
        p = prefix
    )
}
