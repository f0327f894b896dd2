// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

mod commands;
mod context;
mod player;

use context::AppContext;

pub(crate) fn build_cli() -> Command {
    Command::new("securgeek")
        .version(env!("CARGO_PKG_VERSION"))
        .author("SecurGeek")
        .about("Audio lessons for the SecurGeek cybersecurity course")
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("catalog")
                .short('c')
                .long("catalog")
                .value_name("FILE")
                .help("Course catalog (TOML or JSON); defaults to app.catalog_path")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("catalog").about("List modules and lessons with their measured durations"),
        )
        .subcommand(
            Command::new("check")
                .about("Check that a lesson's audio is reachable")
                .arg(
                    Arg::new("lesson")
                        .required(true)
                        .value_name("LESSON_ID")
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(
            Command::new("play")
                .about("Play lessons in the terminal")
                .arg(
                    Arg::new("lesson")
                        .value_name("LESSON_ID")
                        .help("Lesson to start with (default: first lesson)")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("user")
                        .short('u')
                        .long("user")
                        .value_name("EMAIL")
                        .env("SECURGEEK_USER")
                        .help("Signed-in learner"),
                ),
        )
        .subcommand(Command::new("serve").about("Run the chat relay and asset server"))
        .subcommand(
            Command::new("config")
                .about("Manage the configuration file")
                .subcommand_required(true)
                .subcommand(Command::new("init").about("Write a default config.toml"))
                .subcommand(
                    Command::new("show").about("Print the effective configuration").arg(
                        Arg::new("json")
                            .long("json")
                            .help("Print as JSON")
                            .action(ArgAction::SetTrue),
                    ),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let matches = build_cli().get_matches();
    let ctx = AppContext::from_matches(&matches)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(ctx.config.app.log_level.to_string()),
    )
    .init();

    match matches.subcommand() {
        Some(("catalog", _)) => commands::list_catalog(&ctx).await,
        Some(("check", sub_matches)) => {
            let lesson = *sub_matches
                .get_one::<u32>("lesson")
                .context("Lesson ID is required")?;
            commands::check_lesson(&ctx, lesson).await
        }
        Some(("play", sub_matches)) => {
            let lesson = sub_matches.get_one::<u32>("lesson").copied();
            let user = sub_matches.get_one::<String>("user").cloned();
            player::run(&ctx, lesson, user).await
        }
        Some(("serve", _)) => commands::serve(&ctx).await,
        Some(("config", sub_matches)) => match sub_matches.subcommand() {
            Some(("init", _)) => commands::config_init(&ctx),
            Some(("show", show)) => commands::config_show(&ctx, show.get_flag("json")),
            _ => {
                build_cli().print_help()?;
                Ok(())
            }
        },
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
