#![no_main]

use libfuzzer_sys::fuzz_target;
use rankkit::ds::{BOTTOM, RankList, TOP};

// Fuzz arbitrary splice/unlink/free sequences on RankList
//
// Keeps a shadow Vec of the expected order and checks both link directions
// after every operation.
fuzz_target!(|data: &[u8]| {
    let mut list: RankList<u8> = RankList::new();
    let mut order = Vec::new();

    for pair in data.chunks_exact(2) {
        let (op, value) = (pair[0] % 3, pair[1]);
        match op {
            0 => {
                // splice before an existing node, or at the end
                let id = list.alloc(value);
                let position = if order.is_empty() {
                    0
                } else {
                    usize::from(value) % (order.len() + 1)
                };
                let anchor = order.get(position).copied().unwrap_or(BOTTOM);
                assert!(list.splice_before(id, anchor).is_some());
                order.insert(position, id);
            },
            1 => {
                // unlink and free
                if !order.is_empty() {
                    let position = usize::from(value) % order.len();
                    let id = order.remove(position);
                    let expected = *list.node(id).and_then(|n| n.key()).unwrap();
                    assert!(list.unlink(id).is_some());
                    assert_eq!(list.free(id), Some(expected));
                }
            },
            _ => {
                assert!(list.unlink(TOP).is_none());
                assert!(list.free(BOTTOM).is_none());
            },
        }

        assert_eq!(list.len(), order.len());
        let mut prev = TOP;
        for &id in &order {
            assert_eq!(list.prev(id), Some(prev));
            assert_eq!(list.next(prev), Some(id));
            prev = id;
        }
        assert_eq!(list.next(prev), Some(BOTTOM));
        assert_eq!(list.prev(BOTTOM), Some(prev));
        assert_eq!(list.iter().count(), order.len());
    }
});
