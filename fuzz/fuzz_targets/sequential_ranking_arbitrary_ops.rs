#![no_main]

use libfuzzer_sys::fuzz_target;
use rankkit::ranking::sequential::SequentialRanking;

// Fuzz register/top/statistics sequences on SequentialRanking
//
// First byte picks the capacity; each following byte is either a key to
// register or a read of the top entries.
fuzz_target!(|data: &[u8]| {
    let Some((&first, rest)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(first % 32) + 1;
    let mut ranking = SequentialRanking::new(capacity);

    for &byte in rest {
        if byte >= 0xF0 {
            let count = usize::from(byte & 0x0F);
            let top = ranking.top(count);
            let stats = ranking.statistics(count);
            assert_eq!(top.len(), count.min(ranking.len()));
            assert!(stats.keys().eq(top.iter()));
            let weights: Vec<u64> = stats.values().copied().collect();
            assert!(weights.windows(2).all(|w| w[0] >= w[1]));
        } else {
            let was_tracked = ranking.contains(&byte);
            let before = ranking.weight(&byte);
            ranking.register(byte);
            if was_tracked {
                assert_eq!(ranking.weight(&byte), before.map(|w| w + 1));
            }
            assert!(ranking.contains(&byte));
        }
        assert!(ranking.len() <= capacity);
    }
    ranking.check_invariants().unwrap();
});
