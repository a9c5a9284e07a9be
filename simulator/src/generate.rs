use std::{
    fs::File,
    io::{BufWriter, Write},
};

use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

use crate::cli::GenerateArgs;

pub fn write_data_file(args: &GenerateArgs) -> anyhow::Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let file = File::create(&args.data)
        .with_context(|| format!("creating {}", args.data.display()))?;
    let mut out = BufWriter::new(file);
    for _ in 0..args.elements {
        writeln!(out, "{}", rng.gen_range(0..=args.max))?;
    }
    out.flush()?;

    info!(path = %args.data.display(), elements = args.elements, "data file written");
    Ok(())
}
