use crate::domain::model::{Annotation, ChildRecord, JoinStats, NestedEntity, ParentRecord};
use std::collections::HashMap;

/// Nests each child under the parent whose `id` equals the child's `parent_id`.
///
/// One entity per parent, in parent order. Children keep their input order
/// within an entity. When parent ids repeat, the first parent with that id
/// receives every matching child. Orphaned children are dropped.
pub fn join(parents: &[ParentRecord], children: &[ChildRecord]) -> Vec<NestedEntity> {
    join_with_stats(parents, children).0
}

pub fn join_with_stats(
    parents: &[ParentRecord],
    children: &[ChildRecord],
) -> (Vec<NestedEntity>, JoinStats) {
    let mut entities: Vec<NestedEntity> = parents
        .iter()
        .map(|parent| NestedEntity {
            id: parent.id,
            title: parent.title.clone(),
            annotations: Vec::new(),
        })
        .collect();

    // id -> position of the first entity carrying it
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(entities.len());
    for (position, entity) in entities.iter().enumerate() {
        index.entry(entity.id).or_insert(position);
    }

    let mut stats = JoinStats {
        parents: parents.len(),
        children: children.len(),
        ..JoinStats::default()
    };

    for child in children {
        match index.get(&child.parent_id) {
            Some(&position) => {
                entities[position].annotations.push(Annotation {
                    author: child.author.clone(),
                    content: child.content.clone(),
                });
                stats.matched += 1;
            }
            None => {
                tracing::trace!(parent_id = child.parent_id, "dropping orphaned child");
                stats.orphans += 1;
            }
        }
    }

    (entities, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent(id: i64, title: &str) -> ParentRecord {
        ParentRecord {
            id,
            title: title.to_string(),
        }
    }

    fn child(parent_id: i64, author: &str, content: &str) -> ChildRecord {
        ChildRecord {
            parent_id,
            author: author.to_string(),
            content: content.to_string(),
        }
    }

    fn annotation(author: &str, content: &str) -> Annotation {
        Annotation {
            author: author.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_join_books_and_reviews() {
        let parents = vec![parent(101, "A"), parent(102, "B")];
        let children = vec![
            child(101, "John", "Great book!"),
            child(101, "Alice", "Worth reading."),
            child(999, "Bob", "Invalid reference"),
        ];

        let entities = join(&parents, &children);

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id, 101);
        assert_eq!(entities[0].title, "A");
        assert_eq!(
            entities[0].annotations,
            vec![
                annotation("John", "Great book!"),
                annotation("Alice", "Worth reading.")
            ]
        );
        assert_eq!(entities[1].id, 102);
        assert!(entities[1].annotations.is_empty());
    }

    #[test]
    fn test_join_empty_parents() {
        let children = vec![child(1, "x", "y")];
        assert!(join(&[], &children).is_empty());
    }

    #[test]
    fn test_join_empty_children() {
        let parents = vec![parent(1, "one"), parent(2, "two")];
        let entities = join(&parents, &[]);

        assert_eq!(entities.len(), 2);
        assert!(entities.iter().all(|e| e.annotations.is_empty()));
    }

    #[test]
    fn test_join_preserves_parent_order() {
        let parents = vec![parent(3, "c"), parent(1, "a"), parent(2, "b")];
        let ids: Vec<i64> = join(&parents, &[]).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_join_interleaved_children_keep_input_order() {
        let parents = vec![parent(1, "a"), parent(2, "b")];
        let children = vec![
            child(2, "p", "first for 2"),
            child(1, "q", "first for 1"),
            child(2, "r", "second for 2"),
            child(1, "s", "second for 1"),
        ];

        let entities = join(&parents, &children);

        let contents = |e: &NestedEntity| -> Vec<String> {
            e.annotations.iter().map(|a| a.content.clone()).collect()
        };
        assert_eq!(contents(&entities[0]), vec!["first for 1", "second for 1"]);
        assert_eq!(contents(&entities[1]), vec!["first for 2", "second for 2"]);
    }

    #[test]
    fn test_join_duplicate_parent_ids_use_first_match() {
        let parents = vec![parent(7, "first"), parent(7, "second")];
        let children = vec![child(7, "a", "one"), child(7, "b", "two")];

        let entities = join(&parents, &children);

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].annotations.len(), 2);
        assert!(entities[1].annotations.is_empty());
    }

    #[test]
    fn test_join_only_orphans() {
        let parents = vec![parent(1, "a")];
        let children = vec![child(2, "x", "lost"), child(3, "y", "also lost")];

        let (entities, stats) = join_with_stats(&parents, &children);

        assert!(entities[0].annotations.is_empty());
        assert_eq!(stats.orphans, 2);
        assert_eq!(stats.matched, 0);
    }

    #[test]
    fn test_join_stats_account_for_every_child() {
        let parents = vec![parent(101, "A"), parent(102, "B")];
        let children = vec![
            child(101, "John", "Great book!"),
            child(102, "Alice", "Worth reading."),
            child(999, "Bob", "Invalid reference"),
        ];

        let (_, stats) = join_with_stats(&parents, &children);

        assert_eq!(
            stats,
            JoinStats {
                parents: 2,
                children: 3,
                matched: 2,
                orphans: 1,
            }
        );
    }

    #[test]
    fn test_join_is_repeatable_and_leaves_inputs_alone() {
        let parents = vec![parent(1, "a"), parent(2, "b")];
        let children = vec![child(1, "x", "hello"), child(5, "y", "orphan")];
        let parents_before = parents.clone();
        let children_before = children.clone();

        let first = join(&parents, &children);
        let second = join(&parents, &children);

        assert_eq!(first, second);
        assert_eq!(parents, parents_before);
        assert_eq!(children, children_before);
    }

    #[test]
    fn test_join_matched_children_appear_exactly_once() {
        let parents = vec![parent(1, "a"), parent(2, "b"), parent(3, "c")];
        let children: Vec<ChildRecord> = (0..30)
            .map(|i| child(i % 5, &format!("author{}", i), &format!("note{}", i)))
            .collect();

        let entities = join(&parents, &children);

        let total: usize = entities.iter().map(|e| e.annotations.len()).sum();
        let expected = children.iter().filter(|c| (1..=3).contains(&c.parent_id)).count();
        assert_eq!(total, expected);

        for entity in &entities {
            for a in &entity.annotations {
                assert!(children.iter().any(|c| c.parent_id == entity.id
                    && c.author == a.author
                    && c.content == a.content));
            }
        }
    }
}
