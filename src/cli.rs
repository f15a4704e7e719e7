// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

use crate::cmd::add::add_archive;
use crate::cmd::add::add_text;
use crate::cmd::add::add_url;
use crate::cmd::backup::create_backup;
use crate::cmd::backup::list_backups;
use crate::cmd::backup::restore_backup;
use crate::cmd::export::export_session;
use crate::cmd::process::process_source;
use crate::cmd::review::print_due;
use crate::cmd::review::print_feed;
use crate::cmd::review::print_schedule;
use crate::cmd::review::review_unit;
use crate::cmd::sources::list_sources;
use crate::cmd::sources::remove_source;
use crate::cmd::stats::StatsFormat;
use crate::cmd::stats::print_stats;
use crate::config::Config;
use crate::error::Fallible;
use crate::types::response::Response;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the data directory.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new source.
    Add {
        #[command(subcommand)]
        source: AddSource,
    },
    /// Extract study units from a source.
    Process {
        /// The source's ID.
        source: String,
        /// Number of chapters to process, for archives.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Keep processing until the source is complete.
        #[arg(long)]
        all: bool,
    },
    /// List sources and their progress.
    Sources,
    /// Remove a source. Units extracted from it are kept.
    Remove {
        /// The source's ID.
        source: String,
    },
    /// Show the units to study now.
    Feed {
        /// Maximum number of new units to show.
        #[arg(long)]
        new: Option<usize>,
    },
    /// Record a review.
    Review {
        /// The unit's ID, or a unique prefix of it.
        unit: String,
        /// How well you recalled the unit.
        #[arg(value_enum)]
        response: Response,
    },
    /// List the units due for review.
    Due,
    /// Show how many units are due when.
    Schedule,
    /// Print study statistics.
    Stats {
        /// Which output format to use.
        #[arg(long, default_value_t = StatsFormat::Text)]
        format: StatsFormat,
    },
    /// Export units, reviews, and statistics as JSON.
    Export {
        /// Optional path to the output file. By default, print to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Zip the state and content into the backups directory.
    Backup {
        /// List existing backups instead of creating one.
        #[arg(long)]
        list: bool,
    },
    /// Replace the state and content with a backup archive.
    Restore {
        /// Path to the archive.
        archive: PathBuf,
    },
}

#[derive(Subcommand)]
enum AddSource {
    /// A plain text file.
    Text {
        /// A name for the source.
        name: String,
        /// Path to the file.
        file: PathBuf,
    },
    /// A web page.
    Url {
        /// A name for the source.
        name: String,
        /// The page's URL.
        url: String,
    },
    /// An e-book archive (EPUB).
    Archive {
        /// A name for the source.
        name: String,
        /// Path to the archive.
        file: PathBuf,
    },
}

pub fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let data_dir = cli.data_dir;
    let config = Config::load(&data_dir)?;
    match cli.command {
        Command::Add { source } => match source {
            AddSource::Text { name, file } => add_text(data_dir, config, &name, &file),
            AddSource::Url { name, url } => add_url(data_dir, config, &name, &url),
            AddSource::Archive { name, file } => add_archive(data_dir, config, &name, &file),
        },
        Command::Process {
            source,
            batch_size,
            all,
        } => process_source(data_dir, config, &source, batch_size, all),
        Command::Sources => list_sources(data_dir, config),
        Command::Remove { source } => remove_source(data_dir, config, &source),
        Command::Feed { new } => print_feed(data_dir, config, new),
        Command::Review { unit, response } => review_unit(data_dir, config, &unit, response),
        Command::Due => print_due(data_dir, config),
        Command::Schedule => print_schedule(data_dir, config),
        Command::Stats { format } => print_stats(data_dir, config, format),
        Command::Export { output } => export_session(data_dir, config, output),
        Command::Backup { list: false } => create_backup(data_dir, config),
        Command::Backup { list: true } => list_backups(data_dir, config),
        Command::Restore { archive } => restore_backup(data_dir, config, &archive),
    }
}
