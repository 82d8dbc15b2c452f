use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Generate a synthetic email log with planted beacons and organic noise
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output NDJSON file
    #[arg(short, long, default_value = "events.ndjson")]
    output: PathBuf,

    /// Hours of traffic to generate, ending now
    #[arg(long, default_value = "24")]
    hours: i64,

    /// Number of beaconing pairs
    #[arg(long, default_value = "5")]
    beacons: usize,

    /// Number of organic pairs
    #[arg(long, default_value = "200")]
    organic: usize,

    /// Beacon interval in seconds
    #[arg(long, default_value = "300")]
    interval: i64,

    /// Maximum beacon jitter in seconds (±)
    #[arg(long, default_value = "1")]
    jitter: i64,

    /// RNG seed for reproducible output
    #[arg(long, default_value = "7")]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let end = Utc::now();
    let start = end - Duration::hours(args.hours);

    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut out = BufWriter::new(file);
    let mut written = 0usize;

    // Beacons: fixed interval with small jitter, constant-ish size
    for i in 0..args.beacons {
        let sender = format!("svc-{:02}@relay.example", i);
        let receiver = format!("drop-{:02}@mail.example", i);
        let size = rng.gen_range(400..600);
        let mut ts = start + Duration::seconds(rng.gen_range(0..args.interval.max(1)));

        while ts < end {
            write_event(&mut out, &sender, &receiver, ts, size)?;
            written += 1;
            let jitter = if args.jitter > 0 { rng.gen_range(-args.jitter..=args.jitter) } else { 0 };
            ts += Duration::seconds((args.interval + jitter).max(1));
        }
    }

    // Organic: exponential-ish gaps between 1 minute and a few hours
    for i in 0..args.organic {
        let sender = format!("user{:03}@corp.example", i);
        let receiver = format!("user{:03}@corp.example", rng.gen_range(0..args.organic.max(1)));
        let mut ts = start + Duration::seconds(rng.gen_range(0..3600));

        while ts < end {
            let size = rng.gen_range(1_000..250_000);
            write_event(&mut out, &sender, &receiver, ts, size)?;
            written += 1;
            let gap: f64 = -(1.0 - rng.gen::<f64>()).ln() * 2400.0;
            ts += Duration::seconds(gap.max(60.0) as i64);
        }
    }

    out.flush()?;
    println!("Wrote {} events to {}", written, args.output.display());

    Ok(())
}

fn write_event<W: Write>(
    out: &mut W,
    sender: &str,
    receiver: &str,
    ts: DateTime<Utc>,
    size: u32,
) -> anyhow::Result<()> {
    let doc = json!({
        "@timestamp": ts.to_rfc3339(),
        "email": {
            "sender": sender,
            "receiver": receiver,
            "size": size,
        }
    });
    serde_json::to_writer(&mut *out, &doc)?;
    out.write_all(b"\n")?;
    Ok(())
}
