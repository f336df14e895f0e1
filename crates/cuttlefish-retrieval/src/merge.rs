//! Ranking and merging of ticket result sets.
//!
//! Merging is order-independent: union by id, maximum score per id, then
//! descending score with ascending id as the tie-breaker.

use std::collections::HashMap;

use cuttlefish_types::{PointId, Ticket};

/// Sort tickets by descending score, ties by ascending id.
pub fn sort_ranked(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| a.rank_cmp(b));
}

/// Merge result sets into one ranked list of at most `limit` tickets.
pub fn merge_ranked<I>(sets: I, limit: usize) -> Vec<Ticket>
where
    I: IntoIterator<Item = Vec<Ticket>>,
{
    let mut best: HashMap<PointId, Ticket> = HashMap::new();

    for ticket in sets.into_iter().flatten() {
        match best.get_mut(&ticket.id) {
            Some(existing) if existing.score >= ticket.score => {}
            Some(existing) => *existing = ticket,
            None => {
                best.insert(ticket.id.clone(), ticket);
            }
        }
    }

    let mut merged: Vec<Ticket> = best.into_values().collect();
    sort_ranked(&mut merged);
    merged.truncate(limit);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuttlefish_types::ScoredPoint;
    use serde_json::{json, Map};

    fn ticket(id: u64, score: f32, title: &str) -> Ticket {
        Ticket::from_point(ScoredPoint {
            id: PointId::Num(id),
            score,
            payload: json!({"title": title})
                .as_object()
                .cloned()
                .unwrap_or_else(Map::new),
        })
    }

    fn ids(tickets: &[Ticket]) -> Vec<PointId> {
        tickets.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_merge_keeps_max_score() {
        let a = vec![ticket(1, 0.4, "a-low"), ticket(2, 0.9, "b")];
        let b = vec![ticket(1, 0.8, "a-high")];

        let merged = merge_ranked(vec![a, b], 10);
        assert_eq!(ids(&merged), vec![PointId::Num(2), PointId::Num(1)]);
        assert_eq!(merged[1].score, 0.8);
        assert_eq!(merged[1].title, "a-high");
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = vec![ticket(1, 0.7, "x"), ticket(3, 0.5, "y"), ticket(4, 0.5, "z")];
        let b = vec![ticket(3, 0.6, "y"), ticket(2, 0.7, "w"), ticket(5, 0.1, "v")];

        let ab = merge_ranked(vec![a.clone(), b.clone()], 4);
        let ba = merge_ranked(vec![b, a], 4);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let merged = merge_ranked(
            vec![vec![ticket(9, 0.5, "n"), ticket(2, 0.5, "t"), ticket(5, 0.5, "f")]],
            10,
        );
        assert_eq!(
            ids(&merged),
            vec![PointId::Num(2), PointId::Num(5), PointId::Num(9)]
        );
    }

    #[test]
    fn test_truncates_to_limit() {
        let set: Vec<Ticket> = (0..10).map(|i| ticket(i, 0.1 * i as f32, "t")).collect();
        let merged = merge_ranked(vec![set], 3);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].id, PointId::Num(9));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_ranked(Vec::<Vec<Ticket>>::new(), 5).is_empty());
    }
}
