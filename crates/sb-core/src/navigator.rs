//! # Post Navigator
//!
//! Pure prev/next/related derivation over an ordered list of posts.
//! The list wraps around: the post after the last one is the first.

use crate::models::Post;

/// How many related posts the page shows at most.
pub const RELATED_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Navigation {
    pub prev_id: Option<String>,
    pub next_id: Option<String>,
    /// Posts following the current one (wrapping), never including it.
    pub related: Vec<Post>,
}

/// Computes navigation for `current_id` within `all_posts`.
///
/// Returns an empty `Navigation` when the post is absent or is the only one.
/// `related` holds `min(3, n - 1)` distinct posts taken at offsets +1, +2, +3.
pub fn navigate(all_posts: &[Post], current_id: &str) -> Navigation {
    let n = all_posts.len();
    let Some(index) = all_posts.iter().position(|post| post.id == current_id) else {
        return Navigation::default();
    };
    if n <= 1 {
        return Navigation::default();
    }

    // Offsets stop at n - 1 so a short list never wraps back onto the
    // current post or repeats one.
    let related = (1..=RELATED_LIMIT.min(n - 1))
        .map(|offset| all_posts[(index + offset) % n].clone())
        .collect();

    Navigation {
        prev_id: Some(all_posts[(index + n - 1) % n].id.clone()),
        next_id: Some(all_posts[(index + 1) % n].id.clone()),
        related,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posts(ids: &[&str]) -> Vec<Post> {
        ids.iter()
            .map(|id| Post {
                id: id.to_string(),
                title: format!("Post {id}"),
                ..Default::default()
            })
            .collect()
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn four_posts_second_selected() {
        let all = posts(&["A", "B", "C", "D"]);
        let nav = navigate(&all, "B");

        assert_eq!(nav.prev_id.as_deref(), Some("A"));
        assert_eq!(nav.next_id.as_deref(), Some("C"));
        assert_eq!(ids(&nav.related), vec!["C", "D", "A"]);
    }

    #[test]
    fn single_post_has_no_neighbours() {
        let all = posts(&["A"]);
        assert_eq!(navigate(&all, "A"), Navigation::default());
    }

    #[test]
    fn missing_post_yields_empty_navigation() {
        let all = posts(&["A", "B"]);
        assert_eq!(navigate(&all, "Z"), Navigation::default());
        assert_eq!(navigate(&[], "A"), Navigation::default());
    }

    #[test]
    fn wraps_at_both_ends() {
        let all = posts(&["A", "B", "C"]);

        let first = navigate(&all, "A");
        assert_eq!(first.prev_id.as_deref(), Some("C"));
        assert_eq!(first.next_id.as_deref(), Some("B"));

        let last = navigate(&all, "C");
        assert_eq!(last.prev_id.as_deref(), Some("B"));
        assert_eq!(last.next_id.as_deref(), Some("A"));
        assert_eq!(ids(&last.related), vec!["A", "B"]);
    }

    #[test]
    fn two_posts_relate_to_each_other_once() {
        let all = posts(&["A", "B"]);
        let nav = navigate(&all, "A");

        assert_eq!(nav.prev_id.as_deref(), Some("B"));
        assert_eq!(nav.next_id.as_deref(), Some("B"));
        assert_eq!(ids(&nav.related), vec!["B"]);
    }

    #[test]
    fn related_never_contains_current_and_is_capped() {
        for n in 1..=8 {
            let names: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let all = posts(&refs);

            for current in &refs {
                let nav = navigate(&all, current);
                assert_eq!(nav.related.len(), RELATED_LIMIT.min(n - 1));
                assert!(nav.related.iter().all(|p| p.id != *current));

                let mut seen = ids(&nav.related);
                seen.sort();
                seen.dedup();
                assert_eq!(seen.len(), nav.related.len());

                if n > 1 {
                    assert!(refs.contains(&nav.prev_id.as_deref().unwrap()));
                    assert!(refs.contains(&nav.next_id.as_deref().unwrap()));
                }
            }
        }
    }
}
