//! Runs every start value below 1000 through 178 chained Collatz stages
//! multiplexed over one shared thread pool, then prints the terminal sum
//! (exactly 1: only the value starting at 871 needs all 178 steps; the
//! rest reach 1 earlier and are clamped to 0).

use parastream::{Pipeline, ThreadPool};

fn collatz(x: u64) -> u64 {
    if x <= 1 {
        0
    } else if x % 2 == 1 {
        3 * x + 1
    } else {
        x / 2
    }
}

fn main() {
    const DEPTH: usize = 178;

    let pool = ThreadPool::default();
    let mut stages: Vec<Pipeline<u64>> =
        vec![Pipeline::with_pool(1..1000u64, collatz, &pool)];
    for _ in 1..DEPTH {
        let upstream = stages.last().unwrap().iter();
        stages.push(Pipeline::with_pool(upstream, collatz, &pool));
    }

    let sum: u64 = stages.last().unwrap().iter().sum();
    println!("sum over {} stages: {} (expected 1)", DEPTH, sum);

    let first = stages.first().unwrap().metrics();
    println!(
        "first stage: {} items, {:.0} items/s, {:.1} us/step",
        first.total_processed(),
        first.throughput_mps(),
        first.mean_step_us()
    );
}
