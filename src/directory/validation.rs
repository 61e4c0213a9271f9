//! Address syntax check for claims.

/// Maximum address length.
pub const MAX_ADDRESS_LENGTH: usize = 254;

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

fn is_domain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Check that `address` looks like `local@domain.tld`.
///
/// The local part may contain ASCII letters, digits and `_ . + -`; the
/// domain is two or more dot-separated labels of letters, digits and `-`.
pub fn is_valid_address(address: &str) -> bool {
    if address.is_empty() || address.len() > MAX_ADDRESS_LENGTH {
        return false;
    }

    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };

    if local.is_empty() || !local.chars().all(is_local_char) {
        return false;
    }

    let mut labels = domain.split('.');
    let mut count = 0;
    let labels_ok = labels.all(|label| {
        count += 1;
        !label.is_empty() && label.chars().all(is_domain_char)
    });

    labels_ok && count >= 2
}
