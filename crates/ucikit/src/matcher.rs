//! Value comparison between the store and a request
//!
//! `uci get` prints list members separated by spaces and wraps a member
//! that contains whitespace in single quotes. Membership compares whole
//! members, so a desired `10` is not satisfied by a stored `100` and a
//! desired `a b` is not satisfied by the members `x a` and `b y`.

use crate::types::ItemKind;

/// Whether `current` already satisfies `desired` for the given item kind.
///
/// With no desired value this is a presence check.
pub fn satisfied(item: ItemKind, current: Option<&str>, desired: Option<&str>) -> bool {
    let Some(current) = current else {
        return false;
    };

    match desired {
        None => true,
        Some(desired) => match item {
            ItemKind::Option => current == desired,
            ItemKind::List => list_members(current).iter().any(|m| m == desired),
        },
    }
}

/// Split the output of `uci get` on a list into its members.
///
/// Quoted members may contain whitespace; an embedded quote is written
/// as `'\''`.
pub fn list_members(current: &str) -> Vec<String> {
    let mut members = Vec::new();
    let mut chars = current.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut member = String::new();
        if first == '\'' {
            let mut quoted = false;
            while let Some(c) = chars.next() {
                match c {
                    '\'' => quoted = !quoted,
                    '\\' if !quoted && chars.peek() == Some(&'\'') => {
                        chars.next();
                        member.push('\'');
                    }
                    c if c.is_whitespace() && !quoted => break,
                    c => member.push(c),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                member.push(c);
            }
        }
        members.push(member);
    }

    members
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_never_satisfies() {
        assert!(!satisfied(ItemKind::Option, None, None));
        assert!(!satisfied(ItemKind::Option, None, Some("1")));
        assert!(!satisfied(ItemKind::List, None, Some("lan")));
    }

    #[test]
    fn test_presence_only() {
        assert!(satisfied(ItemKind::Option, Some("100"), None));
        assert!(satisfied(ItemKind::List, Some("lan wan"), None));
    }

    #[test]
    fn test_option_equality() {
        assert!(satisfied(ItemKind::Option, Some("1.0.0.0"), Some("1.0.0.0")));
        assert!(!satisfied(ItemKind::Option, Some("1.0.0.0"), Some("1.0.0")));
        assert!(!satisfied(ItemKind::Option, Some("lan "), Some("lan")));
    }

    #[test]
    fn test_list_whole_member() {
        assert!(satisfied(ItemKind::List, Some("lan wan"), Some("wan")));
        assert!(!satisfied(ItemKind::List, Some("100 200"), Some("10")));
        assert!(!satisfied(ItemKind::List, Some("lan6"), Some("lan")));
    }

    #[test]
    fn test_list_member_with_spaces() {
        let current = Some("'x a' 'b y'");
        assert!(!satisfied(ItemKind::List, current, Some("a b")));
        assert!(satisfied(ItemKind::List, current, Some("x a")));
        assert!(satisfied(ItemKind::List, current, Some("b y")));

        // Unquoted words are separate members
        assert!(!satisfied(ItemKind::List, Some("a b c"), Some("b c")));
    }

    #[test]
    fn test_list_members() {
        assert_eq!(list_members("lan  wan\n"), vec!["lan", "wan"]);
        assert_eq!(list_members("'x a' b 'c  d'"), vec!["x a", "b", "c  d"]);
        assert_eq!(list_members(r"'it'\''s here' ok"), vec!["it's here", "ok"]);
        assert_eq!(list_members("don't"), vec!["don't"]);
        assert!(list_members("  ").is_empty());
    }
}
