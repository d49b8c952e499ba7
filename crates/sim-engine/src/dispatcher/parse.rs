//! Shared greedy-name parsing used by `tell`/`whisper`/`examine`/`listen`.
//!
//! Longest candidate prefix wins; quoted names and an explicit `@id:<uuid>`
//! form are both supported. Used anywhere a command needs to split
//! `<target> <rest...>` against a list of present names. Generic over the id
//! type so both character-name and item-name resolution (`examine`) share
//! one implementation.

use uuid::Uuid;

pub struct Candidate<'a, Id> {
    pub id: Id,
    pub name: &'a str,
}

/// Resolves the longest leading prefix of `input` that names one of
/// `candidates`, returning `(matched_id, remainder)`. `remainder` has
/// leading whitespace stripped. `from_uuid` constructs this candidate
/// list's id type from a raw UUID, to support the explicit `@id:<uuid>` form.
pub fn resolve_target<'a, Id: Copy + PartialEq>(
    input: &'a str,
    candidates: &[Candidate<'a, Id>],
    from_uuid: impl Fn(Uuid) -> Id,
) -> Option<(Id, &'a str)> {
    if let Some(rest) = input.strip_prefix("@id:") {
        let (id_token, remainder) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if let Ok(uuid) = id_token.trim_end_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-').parse::<Uuid>() {
            let target = from_uuid(uuid);
            if candidates.iter().any(|c| c.id == target) {
                return Some((target, remainder.trim_start()));
            }
        }
    }

    if let Some(rest) = input.strip_prefix('"') {
        if let Some(end) = rest.find('"') {
            let quoted = &rest[..end];
            let remainder = rest[end + 1..].trim_start();
            if let Some(candidate) = candidates.iter().find(|c| c.name.eq_ignore_ascii_case(quoted)) {
                return Some((candidate.id, remainder));
            }
        }
    }

    let tokens: Vec<&str> = input.split_whitespace().collect();
    let mut best: Option<(Id, usize, &str)> = None;
    for take in (1..=tokens.len()).rev() {
        let prefix = tokens[..take].join(" ");
        if let Some(candidate) = candidates.iter().find(|c| c.name.eq_ignore_ascii_case(&prefix)) {
            let consumed_len: usize = tokens[..take].iter().map(|t| t.len()).sum::<usize>() + (take - 1);
            let remainder = input[consumed_len.min(input.len())..].trim_start();
            best = Some((candidate.id, take, remainder));
            break;
        }
    }
    best.map(|(id, _, remainder)| (id, remainder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_model::CharacterId;

    #[test]
    fn longest_prefix_wins() {
        let a = CharacterId::new();
        let b = CharacterId::new();
        let candidates = vec![
            Candidate { id: a, name: "Bob" },
            Candidate { id: b, name: "Bob the Builder" },
        ];
        let (matched, remainder) = resolve_target("Bob the Builder hello there", &candidates, CharacterId::from_uuid).unwrap();
        assert_eq!(matched, b);
        assert_eq!(remainder, "hello there");
    }

    #[test]
    fn quoted_name_is_matched_exactly() {
        let a = CharacterId::new();
        let candidates = vec![Candidate { id: a, name: "Bob the Builder" }];
        let (matched, remainder) = resolve_target("\"Bob the Builder\" can we fix it", &candidates, CharacterId::from_uuid).unwrap();
        assert_eq!(matched, a);
        assert_eq!(remainder, "can we fix it");
    }

    #[test]
    fn explicit_id_form_matches_by_uuid() {
        let a = CharacterId::new();
        let candidates = vec![Candidate { id: a, name: "Bob" }];
        let input = format!("@id:{} hello", a.0);
        let (matched, remainder) = resolve_target(&input, &candidates, CharacterId::from_uuid).unwrap();
        assert_eq!(matched, a);
        assert_eq!(remainder, "hello");
    }

    #[test]
    fn no_match_returns_none() {
        let candidates: Vec<Candidate<CharacterId>> = vec![];
        assert!(resolve_target("nobody here", &candidates, CharacterId::from_uuid).is_none());
    }
}
