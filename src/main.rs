mod assets;
mod build;
mod config;
mod frontmatter;
mod highlight;
mod i18n;
mod models;
mod pages;
mod parser;
mod posts;
mod prefs;
mod rss;
mod server;
mod site;

use clap::{Parser as ClapParser, Subcommand};
use console::style;
use std::sync::Arc;
use std::time::Instant;

use crate::build::Defaults;
use crate::config::{Config, ConfigError, CONFIG_FILE};
use crate::highlight::{HighlightSettings, Highlighter};
use crate::prefs::{Preference, PreferenceStore, Preferences};

#[derive(ClapParser)]
#[command(author, version, about = "lystok - a bilingual blog, built and served.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Write a starter project into the current directory
    Init,
    /// Render the site into the output directory
    Build,
    /// Build, then serve with live reload
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
    /// Show or change the preferred language
    Lang {
        #[command(subcommand)]
        action: Option<PrefAction>,
    },
    /// Show or change the preferred color theme
    Theme {
        #[command(subcommand)]
        action: Option<PrefAction>,
    },
}

#[derive(Subcommand, Clone)]
enum PrefAction {
    Get,
    Set { value: String },
    Toggle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();
    let root = std::env::current_dir()?;

    if let Commands::Init = cli.command {
        println!("lystok init v{}", env!("CARGO_PKG_VERSION"));
        println!("{} Extracting default assets...", style("[1/1]").dim());
        let written = assets::extract(&root, cli.verbose)?;
        println!("{} Project initialized ({} files).", style("success").cyan(), written);
        println!("Done in {:.2}s.", start.elapsed().as_secs_f32());
        return Ok(());
    }

    let config = match Config::load(&root.join(CONFIG_FILE)) {
        Ok(config) => config,
        // preferences work outside a project too
        Err(ConfigError::NotFound)
            if matches!(cli.command, Commands::Lang { .. } | Commands::Theme { .. }) =>
        {
            Config::default()
        }
        Err(e) => return Err(user_error(e)),
    }
    .rooted_at(&root);

    let mut prefs = Preferences::open(&config.preferences_path);

    match cli.command {
        Commands::Build => {
            println!("lystok build v{}", env!("CARGO_PKG_VERSION"));
            let highlighter = Highlighter::new(HighlightSettings::from(&config.build));
            let defaults = defaults_from(&prefs);
            let site = build::perform_build(&config, &highlighter, defaults, cli.verbose, false).await?;
            println!(
                "{} {} posts rendered into {}",
                style("success").cyan(),
                site.posts.len(),
                config.output_dir.display()
            );
            println!("Done in {:.2}s.", start.elapsed().as_secs_f32());
        }
        Commands::Serve { port } => {
            println!("lystok serve v{}", env!("CARGO_PKG_VERSION"));
            println!("{} Starting server on port {}...", style("[1/1]").dim(), port);
            let highlighter = Arc::new(Highlighter::new(HighlightSettings::from(&config.build)));
            let defaults = defaults_from(&prefs);
            server::serve(config, highlighter, defaults, port, cli.verbose).await?;
        }
        Commands::Lang { action } => run_preference(&mut prefs.language, action)?,
        Commands::Theme { action } => run_preference(&mut prefs.theme, action)?,
        Commands::Init => unreachable!(),
    }
    Ok(())
}

/// Red message for errors returned from `main`, which adds its own `Error:` prefix.
fn user_error(e: impl std::fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("{}", style(e.to_string()).red())
}

fn defaults_from(prefs: &Preferences) -> Defaults {
    Defaults {
        language: prefs.language.current(),
        theme: prefs.theme.current(),
    }
}

fn run_preference<P>(store: &mut PreferenceStore<P>, action: Option<PrefAction>) -> anyhow::Result<()>
where
    P: Preference,
    <P as std::str::FromStr>::Err: std::fmt::Display,
{
    match action.unwrap_or(PrefAction::Get) {
        PrefAction::Get => println!("{}", store.current()),
        PrefAction::Set { value } => {
            let value: P = value
                .parse()
                .map_err(user_error)?;
            store.set(value);
            println!("{} {} = {}", style("success").cyan(), P::STORAGE_KEY, value);
        }
        PrefAction::Toggle => {
            let value = store.toggle();
            println!("{} {} = {}", style("success").cyan(), P::STORAGE_KEY, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_are_not_prefixed_twice() {
        let err = user_error(ConfigError::NotFound);
        let shown = format!("Error: {:?}", err);
        assert_eq!(shown.matches("Error:").count(), 1);
        assert!(shown.contains("lystok.toml not found"));
    }
}
