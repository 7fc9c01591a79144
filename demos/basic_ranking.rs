use rankkit::ranking::sequential::SequentialRanking;

fn main() {
    let mut ranking = SequentialRanking::new(3);

    for word in "the cat and the dog and the bird".split_whitespace() {
        ranking.register(word);
    }

    for (word, weight) in ranking.statistics(3) {
        println!("{word}: {weight}");
    }
    println!("tracked: {}", ranking.len());
}

// Expected output:
// the: 3
// and: 2
// bird: 1
// tracked: 3
//
// Explanation: capacity=3. "the" and "and" climb by repetition. Each new
// word enters at the head of the lowest tier, and once the ranking is full
// the last entry of that tier ("cat", then "dog") is evicted.
