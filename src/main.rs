use clap::Parser;
use film_map::utils::error::{ErrorSeverity, FilmMapError};
use film_map::utils::logger;
use film_map::{run_film_map, CliArgs};
use std::io::{self, BufRead, Write};

fn prompt(question: &str) -> io::Result<String> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

fn fail(e: &FilmMapError) -> ! {
    tracing::error!(
        "❌ Film map failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::debug!("CLI args: {:?}", args);

    let mut settings = match args.resolve() {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };

    // 沒有從參數或設定檔拿到的值就互動詢問
    if settings.query.year.is_none() {
        settings.query.year = Some(prompt(
            "Please enter a year you would like to have a map for: ",
        )?);
    }
    if settings.query.location.is_none() {
        settings.query.location = Some(prompt("Please enter your location (format: lat, long): ")?);
    }

    let config = match settings.into_map_config() {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    println!("Map is generating...\nPlease wait...");

    match run_film_map(config, args.monitor).await {
        Ok(summary) if summary.is_empty() => {
            println!(
                "No film locations found for {} (parsed {}, matched year {}, geocoded {}).",
                summary.year, summary.parsed, summary.matched_year, summary.resolved
            );
            println!("An empty map was still written to {}", summary.output_path);
            if summary.unavailable > 0 {
                println!(
                    "({} lookups failed because the geocoding service was unavailable)",
                    summary.unavailable
                );
            }
        }
        Ok(summary) => {
            println!("Finished. Please have look at the map {}", summary.output_path);
            if summary.skipped > 0 {
                println!("({} malformed lines were skipped)", summary.skipped);
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
