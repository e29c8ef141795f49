use std::cmp::Ordering;

// Sort key for artifact ids like `REQ-2`, `US-10`, `TC-1`. The prefix is
// compared lexicographically before the numeric suffix so `REQ-1` always
// precedes `TC-1`, and `REQ-2` precedes `REQ-10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSortKey {
    pub prefix: String,
    pub number: u64,
}

pub fn id_sort_key(raw: &str) -> IdSortKey {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    match split_prefix_number(&cleaned) {
        Some((prefix, number)) => IdSortKey {
            prefix: prefix.to_string(),
            number,
        },
        // Malformed ids keep their raw form as prefix and sort last within
        // their bucket.
        None => IdSortKey {
            prefix: cleaned,
            number: u64::MAX,
        },
    }
}

// Shallow parse of `^([A-Z-]+)(\d+)?$`; multi-segment numeric suffixes such
// as `REQ-1.2` do not match and fall back to the raw form.
fn split_prefix_number(cleaned: &str) -> Option<(&str, u64)> {
    if cleaned.is_empty() {
        return None;
    }
    let split_at = cleaned
        .find(|ch: char| !(ch.is_ascii_uppercase() || ch == '-'))
        .unwrap_or(cleaned.len());
    if split_at == 0 {
        return None;
    }
    let (prefix, rest) = cleaned.split_at(split_at);
    if rest.is_empty() {
        return Some((prefix, u64::MAX));
    }
    if !rest.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    match rest.parse::<u64>() {
        Ok(number) => Some((prefix, number)),
        Err(_) => None,
    }
}

pub fn compare_ids(a: &str, b: &str) -> Ordering {
    let ka = id_sort_key(a);
    let kb = id_sort_key(b);
    ka.prefix
        .cmp(&kb.prefix)
        .then(ka.number.cmp(&kb.number))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_suffix_sorts_numerically_not_lexically() {
        let mut ids = vec!["REQ-10", "REQ-2", "REQ-1"];
        ids.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(ids, vec!["REQ-1", "REQ-2", "REQ-10"]);
    }

    #[test]
    fn prefix_is_compared_before_number() {
        let mut ids = vec!["TC-1", "REQ-1"];
        ids.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(ids, vec!["REQ-1", "TC-1"]);
    }

    #[test]
    fn malformed_ids_sort_after_well_formed_ones() {
        let mut ids = vec!["REQ-1.2", "REQ-1"];
        ids.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(ids, vec!["REQ-1", "REQ-1.2"]);
        assert_eq!(id_sort_key("REQ-1.2").number, u64::MAX);
    }

    #[test]
    fn case_and_whitespace_are_normalized() {
        let key = id_sort_key(" req-2 ");
        assert_eq!(key.prefix, "REQ-");
        assert_eq!(key.number, 2);
    }
}
