//! Chat command tests.
//!
//! Exercise the `alias` and `email` commands end to end against stored mail.

mod common;

use common::{Pipeline, PREFIX};
use forwarder::{AddressDirectory, CommandHandler, Database, DirectoryError};

async fn reply(handler: &CommandHandler<'_>, user: &str, line: &str) -> String {
    handler.handle(user, line).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_alias_add_rejections() {
    let db = Database::open_in_memory().await.unwrap();
    let handler = CommandHandler::new(&db, PREFIX);

    assert_eq!(
        reply(&handler, "1", ">alias add invalid-address").await,
        "The given alias is invalid"
    );
    assert_eq!(
        reply(&handler, "1", ">alias add b@y.com").await,
        "Successfully added `b@y.com` to your account"
    );
    assert_eq!(
        reply(&handler, "2", ">alias add b@y.com").await,
        "The given alias is already taken"
    );

    // Same outcomes through the directory itself
    let directory = AddressDirectory::new(&db);
    assert!(matches!(
        directory.claim("2", "invalid-address").await,
        Err(DirectoryError::InvalidFormat)
    ));
    assert!(matches!(
        directory.claim("2", "b@y.com").await,
        Err(DirectoryError::AlreadyClaimed)
    ));
}

#[tokio::test]
async fn test_alias_remove_outcomes() {
    let db = Database::open_in_memory().await.unwrap();
    let handler = CommandHandler::new(&db, PREFIX);
    reply(&handler, "1", ">alias add b@y.com").await;

    assert_eq!(
        reply(&handler, "2", ">alias remove b@y.com").await,
        "The given alias does not belong to you"
    );
    assert_eq!(
        reply(&handler, "2", ">alias remove nobody@y.com").await,
        "The given alias is not used"
    );
    assert_eq!(
        reply(&handler, "1", ">alias remove b@y.com").await,
        "Successfully removed `b@y.com` from your account"
    );
    assert_eq!(
        reply(&handler, "1", ">alias list").await,
        "You don't currently have any added aliases"
    );
}

#[tokio::test]
async fn test_empty_inbox_distinct_from_bad_page() {
    let db = Database::open_in_memory().await.unwrap();
    let handler = CommandHandler::new(&db, PREFIX);

    assert_eq!(
        reply(&handler, "1", ">email list").await,
        "Your inbox is empty"
    );
    assert_eq!(
        reply(&handler, "1", ">email list 0").await,
        "There is no such page"
    );

    let malformed = reply(&handler, "1", ">email list two").await;
    assert_ne!(malformed, "Your inbox is empty");
    assert_ne!(malformed, "There is no such page");
}

#[tokio::test]
async fn test_list_and_view_scoped_to_owner() {
    let pipeline = Pipeline::new().await;
    let handler = CommandHandler::new(&pipeline.db, PREFIX);

    reply(&handler, "1", ">alias add mine@y.com").await;
    pipeline.send("a@x.com", "mine@y.com", "Hello", "hi there").await;
    pipeline.send("c@x.com", "other@y.com", "Secret", "nope").await;
    pipeline.process_all().await;

    assert_eq!(
        reply(&handler, "1", ">email list").await,
        "Showing page 1 / 1 (Total 1 emails, showing 10 per page)\n```\n id | [From] Subject\n  1 | [a@x.com] Hello\n```"
    );
    assert_eq!(
        reply(&handler, "1", ">email list 2").await,
        "There is no such page"
    );

    // Someone else's mail looks exactly like a missing one
    let foreign = reply(&handler, "1", ">email view 2").await;
    let missing = reply(&handler, "1", ">email view 99").await;
    assert_eq!(foreign, "That email does not exist");
    assert_eq!(foreign, missing);

    assert_eq!(
        reply(&handler, "1", ">email view 1").await,
        "To: `mine@y.com`\nFrom: `a@x.com`\nSubject: `Hello`\n```\nhi there\n```"
    );
}

#[tokio::test]
async fn test_non_commands_are_ignored() {
    let db = Database::open_in_memory().await.unwrap();
    let handler = CommandHandler::new(&db, PREFIX);

    assert_eq!(handler.handle("1", "alias list").await.unwrap(), None);
    assert_eq!(handler.handle("1", "hello").await.unwrap(), None);
}
