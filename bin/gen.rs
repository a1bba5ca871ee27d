use clap::{Arg, Command};
use std::io::{self, Write};

const NAMES: [&str; 6] = ["jane", "JOHN", "mAry", "o'neil", "ÉMILE", "li"];
const SURNAMES: [&str; 5] = ["DOE", "smith", "McDonald", "von trapp", "ÅNGSTRÖM"];

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic users CSV to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("invalid_every")
                .long("invalid-every")
                .help("Every Nth row gets a malformed email (0 = never)")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .arg(
            Arg::new("duplicate_every")
                .long("duplicate-every")
                .help("Every Nth row repeats the previous row's email (0 = never)")
                .value_parser(clap::value_parser!(u64))
                .default_value("0"),
        )
        .get_matches();

    let rows = matches.get_one::<u64>("rows").copied().unwrap_or_default();
    let invalid_every = matches.get_one::<u64>("invalid_every").copied().unwrap_or_default();
    let duplicate_every = matches
        .get_one::<u64>("duplicate_every")
        .copied()
        .unwrap_or_default();

    let mut out = io::BufWriter::new(io::stdout().lock());
    writeln!(&mut out, "name,surname,email")?;

    // deterministic: same flags, same file
    for i in 1..=rows {
        let name = NAMES[(i as usize) % NAMES.len()];
        let surname = SURNAMES[(i as usize) % SURNAMES.len()];
        let email = if invalid_every > 0 && i % invalid_every == 0 {
            format!("User{i:08}.example.com")
        } else if duplicate_every > 0 && i % duplicate_every == 0 && i > 1 {
            format!("User{:08}@Example.COM", i - 1)
        } else {
            format!("User{i:08}@Example.COM")
        };
        writeln!(&mut out, "{name},\"{surname}\",{email}")?;
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
