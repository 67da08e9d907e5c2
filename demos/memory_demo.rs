use std::alloc::GlobalAlloc;
use std::alloc::Layout;
use std::alloc::System;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use clap::Parser;
use clap::ValueEnum;
use compact_hash::CompactHashMap;
use compact_hash::CompactHashSet;
use compact_hash::Utf8I32Translator;
use compact_hash::Utf8Translator;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

struct CountingAlloc;

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded unchanged to the system allocator.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: `ptr` was returned by `alloc` with this layout.
        unsafe { System.dealloc(ptr, layout) };
        ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Container {
    /// `String -> i32` entries with random 10-character keys.
    Map,
    /// Base-36 renderings of consecutive integers.
    Set,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Storage {
    Regular,
    Compact,
}

/// Fills a container until the heap reaches a budget and reports how many
/// entries fit.
#[derive(Parser, Debug)]
struct Args {
    #[arg(value_enum)]
    storage: Storage,

    #[arg(long, value_enum, default_value_t = Container::Map)]
    container: Container,

    #[arg(short = 'b', long = "budget_mib", default_value_t = 256)]
    budget_mib: usize,
}

fn allocated_mib() -> f64 {
    ALLOCATED.load(Ordering::Relaxed) as f64 / 1_048_576.0
}

fn random_key(rng: &mut SmallRng) -> String {
    // Printable ASCII.
    (0..10).map(|_| rng.random_range(33u8..127) as char).collect()
}

trait Sink {
    fn put(&mut self, rng: &mut SmallRng);
    fn count(&self) -> usize;
}

impl Sink for HashMap<String, i32> {
    fn put(&mut self, rng: &mut SmallRng) {
        self.insert(random_key(rng), rng.random());
    }

    fn count(&self) -> usize {
        self.len()
    }
}

impl Sink for CompactHashMap<Utf8I32Translator<compact_hash::DefaultHashBuilder>> {
    fn put(&mut self, rng: &mut SmallRng) {
        self.insert(random_key(rng), rng.random());
    }

    fn count(&self) -> usize {
        self.len()
    }
}

fn radix36(mut n: usize) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(char::from_digit((n % 36) as u32, 36).unwrap_or('0'));
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

impl Sink for HashSet<String> {
    fn put(&mut self, _rng: &mut SmallRng) {
        self.insert(radix36(self.len()));
    }

    fn count(&self) -> usize {
        self.len()
    }
}

impl Sink for CompactHashSet<Utf8Translator<compact_hash::DefaultHashBuilder>> {
    fn put(&mut self, _rng: &mut SmallRng) {
        self.add(radix36(self.len()));
    }

    fn count(&self) -> usize {
        self.len()
    }
}

fn fill(sink: &mut dyn Sink, budget_mib: usize) {
    let mut rng = SmallRng::from_os_rng();
    let mut last_print = Instant::now();
    while allocated_mib() < budget_mib as f64 {
        sink.put(&mut rng);
        if last_print.elapsed() > Duration::from_millis(100) {
            print!("\rCount = {}, Memory = {:.2} MiB", sink.count(), allocated_mib());
            last_print = Instant::now();
        }
    }
    println!(
        "\rCount = {}, Memory = {:.2} MiB",
        sink.count(),
        allocated_mib()
    );
    println!(
        "{:.1} bytes per entry",
        ALLOCATED.load(Ordering::Relaxed) as f64 / sink.count().max(1) as f64
    );
}

fn main() {
    let args = Args::parse();

    println!(
        "Filling a {:?} {:?} up to {} MiB of heap",
        args.storage, args.container, args.budget_mib
    );

    let mut sink: Box<dyn Sink> = match (args.container, args.storage) {
        (Container::Map, Storage::Regular) => Box::new(HashMap::<String, i32>::new()),
        (Container::Map, Storage::Compact) => {
            Box::new(CompactHashMap::new(Utf8I32Translator::new()))
        }
        (Container::Set, Storage::Regular) => Box::new(HashSet::<String>::new()),
        (Container::Set, Storage::Compact) => {
            Box::new(CompactHashSet::new(Utf8Translator::new()))
        }
    };
    fill(sink.as_mut(), args.budget_mib);
}
