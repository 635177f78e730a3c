//! "Did you mean" hints for mistyped family and sprite set names

/// Levenshtein distance between two strings, by character.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Up to three candidates within `max_distance` of `query`, closest first.
/// Comparison ignores case.
pub fn suggest<'a>(query: &str, candidates: &[&'a str], max_distance: usize) -> Vec<&'a str> {
    let query = query.to_lowercase();
    let mut scored: Vec<(&str, usize)> = candidates
        .iter()
        .map(|&candidate| (candidate, edit_distance(&query, &candidate.to_lowercase())))
        .filter(|&(_, distance)| distance <= max_distance)
        .collect();
    scored.sort_by_key(|&(_, distance)| distance);
    scored.into_iter().take(3).map(|(name, _)| name).collect()
}

/// "Did you mean ..." line for the closest candidates, if any are close.
pub fn did_you_mean(query: &str, candidates: &[&str]) -> Option<String> {
    match suggest(query, candidates, 3).as_slice() {
        [] => None,
        [one] => Some(format!("Did you mean '{}'?", one)),
        [first, rest @ ..] => {
            let rest: Vec<String> = rest.iter().map(|name| format!("'{}'", name)).collect();
            Some(format!("Did you mean '{}' or {}?", first, rest.join(" or ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("", "red"), 3);
        assert_eq!(edit_distance("blue", "blue"), 0);
        assert_eq!(edit_distance("blu", "blue"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_suggest_orders_by_distance() {
        let names = ["blue", "red", "green"];
        assert_eq!(suggest("blu", &names, 1), vec!["blue"]);
        assert_eq!(suggest("RED", &names, 0), vec!["red"]);
        assert!(suggest("chartreuse", &names, 2).is_empty());
    }

    #[test]
    fn test_did_you_mean() {
        assert_eq!(did_you_mean("blu", &["blue", "green"]), Some("Did you mean 'blue'?".to_string()));
        assert_eq!(
            did_you_mean("ninj", &["ninja", "ninja2"]),
            Some("Did you mean 'ninja' or 'ninja2'?".to_string())
        );
        assert_eq!(did_you_mean("zzzzzzzz", &["blue"]), None);
    }
}
