#![cfg(not(loom))]

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};
use tether::{ListError, NodeId, Op, OptimisticList};

const CAPACITY: usize = 12;

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..CAPACITY).prop_map(Op::InsertFront),
        (0..CAPACITY).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn test_list_matches_deque_model(ops in proptest::collection::vec(op_strategy(), 1..120)) {
        let list = OptimisticList::new(CAPACITY);
        let mut model: VecDeque<NodeId> = VecDeque::new();

        for op in ops {
            let result = op.try_apply(&list);
            match op {
                Op::InsertFront(id) => {
                    if model.contains(&id) {
                        prop_assert_eq!(result, Err(ListError::AlreadyMember(id)));
                    } else {
                        prop_assert_eq!(result, Ok(()));
                        model.push_front(id);
                    }
                }
                Op::Remove(id) => {
                    if let Some(pos) = model.iter().position(|&m| m == id) {
                        prop_assert_eq!(result, Ok(()));
                        model.remove(pos);
                    } else {
                        prop_assert_eq!(result, Err(ListError::NotMember(id)));
                    }
                }
            }

            prop_assert_eq!(list.snapshot(), Vec::from(model.clone()));
            prop_assert_eq!(list.len(), model.len());
            prop_assert!(list.check_invariants().is_ok());
        }

        for (pos, &id) in model.iter().enumerate() {
            prop_assert!(list.contains(id));
            prop_assert_eq!(list.next_of(id), model.get(pos + 1).copied());
            let prev = pos.checked_sub(1).map(|p| model[p]);
            prop_assert_eq!(list.prev_of(id), prev);
            prop_assert!(list.validate(prev, Some(id)));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Removes a random subset of the initial members while inserting fresh ids.
    #[test]
    fn test_concurrent_batch_preserves_survivor_order(
        removed in proptest::collection::vec(any::<bool>(), 16),
        inserted in 1usize..16,
        threads in 1usize..6,
    ) {
        let initial: Vec<NodeId> = (0..16).collect();
        let list = OptimisticList::from_order(32, &initial).unwrap();

        let mut ops: Vec<Op> = removed
            .iter()
            .enumerate()
            .filter(|(_, gone)| **gone)
            .map(|(id, _)| Op::Remove(id))
            .collect();
        ops.extend((16..16 + inserted).map(Op::InsertFront));
        tether::workload::run_scoped(&list, &ops, threads);

        let survivors: Vec<NodeId> = initial.iter().copied().filter(|&id| !removed[id]).collect();
        let members = list.snapshot();
        prop_assert_eq!(members.len(), survivors.len() + inserted);

        let (front, back) = members.split_at(inserted);
        let front: HashSet<NodeId> = front.iter().copied().collect();
        prop_assert_eq!(front, (16..16 + inserted).collect::<HashSet<_>>());
        prop_assert_eq!(back, survivors.as_slice());
        prop_assert!(list.check_invariants().is_ok());
    }
}
