use clap::{value_parser, Arg, Command};
use env_logger::Env;
use log::info;
use std::error::Error;
use std::fs;

use crossfill::{
    render_clues, Dictionary, Generator, GeneratorConfig, Grid, MAX_GRID_DIMENSION,
    MAX_WORD_LENGTH,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let matches = Command::new("crossfill")
        .about("Fill a crossword grid from a word/clue list")
        .arg(
            Arg::new("dictionary")
                .value_name("DICTIONARY")
                .help("Word list, alternating word and clue lines")
                .required(true),
        )
        .arg(
            Arg::new("width")
                .value_name("WIDTH")
                .help("Width of a blank grid")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("height")
                .value_name("HEIGHT")
                .help("Height of a blank grid")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("template")
                .short('t')
                .long("template")
                .value_name("FILE")
                .help("Grid template, with # for walls and . for blank cells")
                .conflicts_with_all(["width", "height"]),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("N")
                .help("Seed for reproducible output")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("attempts")
                .short('a')
                .long("attempts")
                .value_name("N")
                .help("Fill attempts before undoing earlier placements")
                .value_parser(value_parser!(usize))
                .default_value("100"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Also write the filled grid and clues to this file"),
        )
        .get_matches();

    let grid = match (
        matches.get_one::<String>("template"),
        matches.get_one::<usize>("width"),
        matches.get_one::<usize>("height"),
    ) {
        (Some(path), _, _) => Grid::from_template(&fs::read_to_string(path)?)?,
        (None, Some(&width), Some(&height)) => Grid::new(width, height)?,
        (None, Some(&size), None) => Grid::new(size, size)?,
        (None, None, _) => {
            return Err(format!(
                "either a template or grid dimensions (at most {}) are required",
                MAX_GRID_DIMENSION
            )
            .into())
        }
    };

    let dictionary_path = matches
        .get_one::<String>("dictionary")
        .ok_or("dictionary not included")?;
    let dictionary = Dictionary::load(dictionary_path, MAX_WORD_LENGTH)?;
    info!(
        "loaded {} entries ({} distinct words) from {}",
        dictionary.len(),
        dictionary.word_count(),
        dictionary_path
    );

    let config = GeneratorConfig {
        max_attempts: matches.get_one::<usize>("attempts").copied().unwrap_or(100),
        ..GeneratorConfig::default()
    };
    let seed = matches.get_one::<u64>("seed").copied();

    let mut generator = Generator::with_seed(&dictionary, grid, config, seed);
    let solved = generator.solve()?;

    println!("{:?}", generator.statistics());
    if !solved {
        eprintln!("Failed to fill the grid");
        std::process::exit(1);
    }

    let output = format!("{}\n\n{}", generator.grid(), render_clues(&generator.clues()));
    println!("{}", output);

    if let Some(path) = matches.get_one::<String>("output") {
        fs::write(path, output)?;
        println!("written output to {}", path);
    }

    Ok(())
}
