use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use graph_hop_core::queries::{HAS_CREATOR, IS_LOCATED_IN, KNOWS, REPLY_OF, STUDY_AT, WORK_AT};
use graph_hop_core::{
    expand, path_length, person_search, recent_messages, CountingPort, EngineConfig,
    ExpandRequest, MemoryGraph, PropertyBundle, Value, VertexId, VertexLabel, UNREACHABLE,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Run every topology (default)
    All,
    /// Watts-Strogatz ring lattice + shortcuts
    Smallworld,
    /// Preferential attachment via edge sampling (hub-and-spoke)
    Scalefree,
    /// Erdos-Renyi uniform random friendships
    Random,
}

#[derive(Parser, Debug)]
#[command(name = "graph-hop-bench")]
#[command(about = "Benchmark bounded expansion, person search and path length on synthetic social networks")]
struct Args {
    /// Which `knows` topology to generate.
    #[arg(long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Number of persons in the generated network.
    #[arg(long, default_value_t = 100_000)]
    persons: u64,

    /// JSON engine config; defaults apply when omitted.
    #[arg(long, env = "GRAPH_HOP_CONFIG")]
    config: Option<PathBuf>,

    /// First name searched for by the person-search query.
    #[arg(long, default_value = "Karl")]
    first_name: String,

    /// Print the person-search records as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.persons < 2 {
        anyhow::bail!("--persons must be at least 2, got {}", args.persons);
    }
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    info!(?config, "engine configuration");

    println!("graph-hop-bench");
    println!("===============");
    println!();

    let topologies: Vec<(&str, fn(&mut Builder))> = match args.mode {
        Mode::Smallworld => vec![("Small-world (Watts-Strogatz)", knows_small_world)],
        Mode::Scalefree => vec![("Scale-free (edge sampling)", knows_scale_free)],
        Mode::Random => vec![("Erdos-Renyi random", knows_random)],
        Mode::All => vec![
            ("Small-world (Watts-Strogatz)", knows_small_world as fn(&mut Builder)),
            ("Scale-free (edge sampling)", knows_scale_free),
            ("Erdos-Renyi random", knows_random),
        ],
    };

    for (name, topology) in topologies {
        run_benchmark(name, topology, &args, &config)?;
    }
    Ok(())
}

fn run_benchmark(name: &str, topology: fn(&mut Builder), args: &Args, config: &EngineConfig) -> Result<()> {
    println!("--- {} ---", name);
    println!("Target: {} persons", args.persons);

    let t = Instant::now();
    let graph = generate(args.persons, topology);
    let gen_time = t.elapsed();
    println!(
        "Generated in {:.2}s: {} vertices, {} edges, ~{:.0}MB",
        gen_time.as_secs_f64(),
        graph.vertex_count(),
        graph.edge_count(),
        graph.memory_usage() as f64 / 1_048_576.0
    );

    // Unfiltered expansion from person 0
    println!();
    println!("{:>8} {:>12} {:>12} {:>10}", "depth", "found", "visited", "time");
    println!("{:->8} {:->12} {:->12} {:->10}", "", "", "", "");

    for depth in [1, 2, 3, 4, 5, 6] {
        let t = Instant::now();
        let result = expand(&graph, &ExpandRequest::new(0, KNOWS, depth))?;
        let elapsed = t.elapsed();
        println!(
            "{:>8} {:>12} {:>12} {:>8.1}ms",
            depth,
            result.buckets.len(),
            result.vertices_visited,
            elapsed.as_secs_f64() * 1000.0
        );
        if result.vertices_visited as u64 >= args.persons {
            println!("{:>8} (every person reached)", "");
            break;
        }
    }

    // Person search through a counting port
    println!();
    let port = CountingPort::new(&graph);
    let t = Instant::now();
    let records = person_search(&port, config, 0, &args.first_name)?;
    let elapsed = t.elapsed();
    let trips = port.round_trips();
    println!(
        "Person search '{}' within {} hops: {} matches in {:.1}ms ({} round trips, {} batched)",
        args.first_name,
        config.max_hops,
        records.len(),
        elapsed.as_secs_f64() * 1000.0,
        trips.total(),
        trips.batched()
    );

    // Shortest path: person 0 to the last person
    let far = args.persons - 1;
    let t = Instant::now();
    let hops = path_length(&graph, config, 0, far)?;
    let elapsed = t.elapsed();
    if hops == UNREACHABLE {
        println!(
            "Shortest path 0 -> {}: no path within {} hops ({:.1}ms)",
            far,
            config.path_max_hops,
            elapsed.as_secs_f64() * 1000.0
        );
    } else {
        println!(
            "Shortest path 0 -> {}: {} hops in {:.1}ms",
            far,
            hops,
            elapsed.as_secs_f64() * 1000.0
        );
    }

    // Recent messages of person 0
    let port = CountingPort::new(&graph);
    let t = Instant::now();
    let messages = recent_messages(&port, config, 0)?;
    let elapsed = t.elapsed();
    println!(
        "Recent messages of 0: {} messages, {} with root post, {:.1}ms ({} round trips)",
        messages.len(),
        messages.iter().filter(|m| m.root.is_some()).count(),
        elapsed.as_secs_f64() * 1000.0,
        port.round_trips().total()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// Generators: single-threaded, deterministic, O(persons + edges)
// ---------------------------------------------------------------------------

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.next(items.len() as u64) as usize]
    }
}

const FIRST_NAMES: [&str; 12] = [
    "Karl", "Anna", "Jan", "Mehmet", "Yang", "Maria", "Ali", "Chen", "Eva", "Ivan", "Lina", "Otto",
];
const LAST_NAMES: [&str; 10] = [
    "Berg", "Adler", "Zimmer", "Kovac", "Wang", "Silva", "Khan", "Novak", "Moreau", "Fischer",
];
const BROWSERS: [&str; 4] = ["Firefox", "Chrome", "Safari", "Opera"];
const LANGUAGES: [&str; 5] = ["en", "de", "zh", "es", "tr"];

/// 2010-01-01T00:00:00Z
const EPOCH_2010: i64 = 1_262_304_000;
const YEAR_SECS: i64 = 31_536_000;

/// Network under construction. Persons take ids `0..persons`; every other
/// vertex is allocated after them.
struct Builder {
    graph: MemoryGraph,
    rng: FastRng,
    persons: u64,
    next_id: VertexId,
}

impl Builder {
    fn new(persons: u64, seed: u64) -> Self {
        let mut graph = MemoryGraph::with_capacity((persons * 6) as usize, (persons * 30) as usize);
        for id in 0..persons {
            graph.add_vertex(id, VertexLabel::Person, Some(format!("person:{}", id)));
        }
        Self {
            graph,
            rng: FastRng::new(seed),
            persons,
            next_id: persons,
        }
    }

    fn alloc(&mut self, label: VertexLabel) -> VertexId {
        let id = self.next_id;
        self.next_id += 1;
        self.graph.add_vertex(id, label, Some(format!("{}:{}", label, id)));
        id
    }

    /// A date within `span_years` after 2010.
    fn date(&mut self, span_years: i64) -> DateTime<Utc> {
        let secs = EPOCH_2010 + self.rng.next((span_years * YEAR_SECS) as u64) as i64;
        DateTime::from_timestamp(secs, 0).unwrap_or_default()
    }

    fn edge_with(&mut self, from: VertexId, to: VertexId, label: &str, name: &str, value: Value) {
        let rt = self.graph.intern_rel_type(label);
        let mut props = PropertyBundle::new();
        props.insert(name.to_string(), value);
        self.graph.add_edge_with_properties(from, to, rt, props);
    }

    /// Friendship is symmetric: stored in both directions with one date.
    fn knows(&mut self, a: VertexId, b: VertexId) {
        if a == b {
            return;
        }
        let since = Value::Date(self.date(3));
        self.edge_with(a, b, KNOWS, "creationDate", since.clone());
        self.edge_with(b, a, KNOWS, "creationDate", since);
    }
}

fn generate(persons: u64, topology: fn(&mut Builder)) -> MemoryGraph {
    let mut b = Builder::new(persons, 42);
    topology(&mut b);
    populate(&mut b);
    b.graph
}

/// Places, organisations, person attributes and message threads.
fn populate(b: &mut Builder) {
    let countries: Vec<VertexId> = (0..20)
        .map(|i| {
            let id = b.alloc(VertexLabel::Country);
            b.graph.set_property(id, "name", format!("Country_{}", i));
            id
        })
        .collect();
    let cities: Vec<VertexId> = (0..(b.persons / 500).max(10))
        .map(|i| {
            let id = b.alloc(VertexLabel::City);
            b.graph.set_property(id, "name", format!("City_{}", i));
            let country = countries[b.rng.next(countries.len() as u64) as usize];
            b.graph.add_edge_named(id, country, IS_LOCATED_IN);
            id
        })
        .collect();
    let universities: Vec<VertexId> = (0..(b.persons / 1000).max(5))
        .map(|i| {
            let id = b.alloc(VertexLabel::University);
            b.graph.set_property(id, "name", format!("University_{}", i));
            let city = cities[b.rng.next(cities.len() as u64) as usize];
            b.graph.add_edge_named(id, city, IS_LOCATED_IN);
            id
        })
        .collect();
    let companies: Vec<VertexId> = (0..(b.persons / 500).max(5))
        .map(|i| {
            let id = b.alloc(VertexLabel::Company);
            b.graph.set_property(id, "name", format!("Company_{}", i));
            let country = countries[b.rng.next(countries.len() as u64) as usize];
            b.graph.add_edge_named(id, country, IS_LOCATED_IN);
            id
        })
        .collect();

    for person in 0..b.persons {
        let first = b.rng.pick(&FIRST_NAMES);
        let last = b.rng.pick(&LAST_NAMES);
        let browser = b.rng.pick(&BROWSERS);
        let language = b.rng.pick(&LANGUAGES);
        let birthday = b.date(1) - chrono::Duration::days(365 * (20 + b.rng.next(40) as i64));
        let joined = b.date(2);
        let g = &mut b.graph;
        g.set_property(person, "firstName", first);
        g.set_property(person, "lastName", last);
        g.set_property(person, "gender", if person % 2 == 0 { "female" } else { "male" });
        g.set_property(person, "birthday", birthday);
        g.set_property(person, "creationDate", joined);
        g.set_property(person, "browserUsed", browser);
        g.set_property(person, "locationIP", format!("10.{}.{}.{}", person % 256, (person / 256) % 256, person % 7));
        g.set_property(person, "email", vec![format!("{}{}@{}.example", first, person, last)]);
        g.set_property(person, "language", vec![language.to_string(), "en".to_string()]);

        let city = cities[b.rng.next(cities.len() as u64) as usize];
        b.graph.add_edge_named(person, city, IS_LOCATED_IN);

        if b.rng.next(2) == 0 {
            let uni = universities[b.rng.next(universities.len() as u64) as usize];
            let year = 1990 + b.rng.next(23) as i64;
            b.edge_with(person, uni, STUDY_AT, "classYear", Value::Int(year));
        }
        for _ in 0..b.rng.next(3) {
            let company = companies[b.rng.next(companies.len() as u64) as usize];
            let from = 1995 + b.rng.next(18) as i64;
            b.edge_with(person, company, WORK_AT, "workFrom", Value::Int(from));
        }
    }

    // One post per person, then comments replying to any earlier message.
    // Ids and dates both increase, so every reply is newer than its parent.
    let mut messages: Vec<VertexId> = Vec::with_capacity((b.persons * 3) as usize);
    let base = EPOCH_2010 + 3 * YEAR_SECS;
    for author in 0..b.persons {
        let post = b.alloc(VertexLabel::Post);
        b.graph.set_property(post, "content", format!("post by {}", author));
        b.graph.add_edge_named(post, author, HAS_CREATOR);
        messages.push(post);
    }
    for _ in 0..b.persons * 2 {
        let comment = b.alloc(VertexLabel::Comment);
        let author = b.rng.next(b.persons);
        let parent = messages[b.rng.next(messages.len() as u64) as usize];
        b.graph.set_property(comment, "content", format!("reply to {}", parent));
        b.graph.add_edge_named(comment, author, HAS_CREATOR);
        b.graph.add_edge_named(comment, parent, REPLY_OF);
        messages.push(comment);
    }
    for (i, &message) in messages.iter().enumerate() {
        let date = DateTime::from_timestamp(base + i as i64 * 60, 0).unwrap_or_default();
        b.graph.set_property(message, "creationDate", date);
    }
}

/// Small-world (Watts-Strogatz): ring lattice + random rewiring.
///
/// Each person knows K ring neighbors on each side; each friendship is
/// rewired to a random person with probability p. High clustering, short
/// paths.
fn knows_small_world(b: &mut Builder) {
    let k = 5u64;
    let p = 0.05f64;
    let n = b.persons;
    for i in 0..n {
        for j in 1..=k {
            let neighbor = (i + j) % n;
            if b.rng.next_f64() < p {
                let rewired = b.rng.next(n);
                b.knows(i, if rewired != i { rewired } else { neighbor });
            } else {
                b.knows(i, neighbor);
            }
        }
    }
}

/// Scale-free via edge-list sampling (O(edges), not O(n²)).
///
/// Preferential attachment by picking a random existing friendship and
/// connecting to one of its endpoints.
fn knows_scale_free(b: &mut Builder) {
    let per_person = 5u64;
    let n = b.persons;
    let mut endpoints: Vec<VertexId> = Vec::with_capacity((n * per_person * 2) as usize);

    // Seed: small clique
    let seed = 5u64.min(n);
    for i in 0..seed {
        for j in (i + 1)..seed {
            b.knows(i, j);
            endpoints.push(i);
            endpoints.push(j);
        }
    }

    for person in seed..n {
        for _ in 0..per_person.min(person) {
            let target = endpoints[b.rng.next(endpoints.len() as u64) as usize];
            if target != person {
                b.knows(person, target);
                endpoints.push(person);
                endpoints.push(target);
            }
        }
    }
}

/// Erdos-Renyi: uniform random friendships, ~5 per person.
fn knows_random(b: &mut Builder) {
    let n = b.persons;
    for _ in 0..n * 5 {
        let a = b.rng.next(n);
        let c = b.rng.next(n);
        b.knows(a, c);
    }
}
