use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rankkit::builder::RankingBuilder;

fn main() {
    let ranking = Arc::new(
        RankingBuilder::new(4)
            .index_shards(8)
            .build_concurrent::<&'static str>(),
    );

    let feeds = [
        ["GET /", "GET /", "GET /login", "GET /"],
        ["GET /", "GET /about", "GET /login", "GET /"],
        ["GET /img", "GET /", "GET /login", "GET /login"],
    ];

    let handles: Vec<_> = feeds
        .into_iter()
        .map(|feed| {
            let ranking = Arc::clone(&ranking);
            thread::spawn(move || {
                for request in feed {
                    ranking.register(request);
                }
            })
        })
        .collect();
    for handle in handles {
        let _ = handle.join();
    }

    println!("GET / seen {} times", ranking.weight(&"GET /").unwrap_or(0));

    match ranking.try_statistics_for(4, Duration::from_millis(100)) {
        Ok(stats) => {
            for (request, weight) in stats {
                println!("{request}: {weight}");
            }
        },
        Err(timeout) => println!("{timeout}"),
    }
}

// Expected output (first line):
// GET / seen 6 times
//
// Explanation: only four distinct requests arrive, so nothing is evicted.
// "GET /" is always created while every tracked weight is still 1, so it
// ends at exactly 6. Later keys start from whatever weight the lowest tier
// has reached when they first arrive, so the rest of the listing depends
// on the thread interleaving.
