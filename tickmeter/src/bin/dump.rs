use std::{env, fs::File};

use anyhow::anyhow;

use tickmeter::{code::utils::format_listing, find_all, MethodBody, PatchConfig};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let input_json = args
        .get(1)
        .ok_or_else(|| anyhow!("usage: dump <body.json>"))?;

    let file = File::open(input_json)?;
    let body: MethodBody = serde_json::from_reader(file)?;

    println!("{}", format_listing(&body));

    let template = PatchConfig::default().pattern().instantiate(&body)?;
    let offsets = find_all(&body.instructions, &template)?;
    println!("Invoke sequences at: {:?}", offsets);

    Ok(())
}
