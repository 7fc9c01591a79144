#![no_main]

use libfuzzer_sys::fuzz_target;
use rankkit::ranking::concurrent::ConcurrentRanking;
use rankkit::ranking::sequential::SequentialRanking;

// Replays the same single-threaded sequence on the sequential and the
// lock-coupled engine and requires identical rankings.
fuzz_target!(|data: &[u8]| {
    let Some((&first, rest)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(first % 16) + 1;
    let mut sequential = SequentialRanking::new(capacity);
    let concurrent = ConcurrentRanking::new(capacity);

    for &key in rest {
        sequential.register(key);
        concurrent.register(key);
    }

    let expected: Vec<_> = sequential.statistics(capacity).into_iter().collect();
    let actual: Vec<_> = concurrent.statistics(capacity).into_iter().collect();
    assert_eq!(actual, expected);
    assert_eq!(concurrent.insertion_point(), sequential.insertion_point().copied());
    concurrent.check_invariants().unwrap();
});
