use clap::Parser;
use compact_hash::CompactHashMap;
use compact_hash::Utf8I32Translator;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Fraction of the inserted entries to remove again afterwards.
    #[arg(short = 'r', long = "remove_fraction", default_value_t = 0.25)]
    remove_fraction: f64,
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating CompactHashMap with target capacity: {}",
        args.target_capacity
    );

    let mut map = CompactHashMap::with_capacity(Utf8I32Translator::new(), args.target_capacity);

    println!("Actual capacity: {}", map.capacity());
    println!("Filling map with String -> i32 entries...");

    for i in 0..args.target_capacity {
        map.insert(format!("key_{i}"), i as i32);
    }

    println!("Inserted {} entries into map", map.len());
    map.probe_histogram().print();
    map.debug_stats().print();

    let mut rng = SmallRng::from_os_rng();
    let mut removed = 0;
    let mut cursor = map.cursor();
    while let Ok(Some(_)) = cursor.next(&map) {
        if rng.random_bool(args.remove_fraction.clamp(0.0, 1.0)) && cursor.remove(&mut map).is_ok()
        {
            removed += 1;
        }
    }

    println!("Removed {removed} entries through a cursor");
    map.debug_stats().print();

    map.shrink_to_fit();
    println!("After shrink_to_fit:");
    map.probe_histogram().print();
    map.debug_stats().print();
    map.check_structure();
}
