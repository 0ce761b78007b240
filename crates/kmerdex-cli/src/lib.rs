use clap::{value_parser, Arg, ArgAction, Command, ValueHint};

pub mod input;
pub mod output;
pub mod runner;

pub use runner::Runner;

fn parameters() -> Arg {
    Arg::new("parameters")
        .required(true)
        .value_parser(clap::builder::NonEmptyStringValueParser::new())
        .help("Path to configuration parameters (JSON file)")
        .value_hint(ValueHint::FilePath)
}

fn output_directory() -> Arg {
    Arg::new("output_directory")
        .short('o')
        .long("output_directory")
        .value_parser(clap::builder::NonEmptyStringValueParser::new())
        .help(
            "Path where the index or search results will be written. \
             Overrides the directory specified in the configuration file.",
        )
        .value_hint(ValueHint::DirPath)
}

pub fn command() -> Command {
    Command::new("kmerdex")
        .version(clap::crate_version!())
        .about("Build k-mer weight indices from protein databases and match spectra against them")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("build")
                .about("Build the k-mer weight index of a FASTA database")
                .arg(parameters())
                .arg(
                    Arg::new("fasta")
                        .short('f')
                        .long("fasta")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to FASTA database. Overrides the FASTA file \
                             specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(output_directory())
                .arg(
                    Arg::new("kmer_length")
                        .short('k')
                        .long("kmer-length")
                        .value_parser(value_parser!(usize))
                        .help("Number of residues per window. Overrides `database.kmer_length`.")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Abort on the first protein with an unknown residue"),
                )
                .arg(
                    Arg::new("validate")
                        .long("validate")
                        .action(ArgAction::SetTrue)
                        .help("Reload the written index and check it against the built one"),
                ),
        )
        .subcommand(
            Command::new("search")
                .about("Look up every fragment of mzXML spectra with a peptide match service")
                .arg(parameters())
                .arg(
                    Arg::new("mzxml_paths")
                        .num_args(1..)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Paths to mzXML files to process. Overrides mzXML files listed in the \
                             configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(output_directory())
                .arg(
                    Arg::new("url")
                        .long("url")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help("Match service endpoint. Overrides `service.url`.")
                        .value_hint(ValueHint::Url),
                )
                .arg(
                    Arg::new("workers")
                        .long("workers")
                        .value_parser(value_parser!(usize))
                        .help("Number of concurrent lookups (default = 16)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("sequential")
                        .long("sequential")
                        .action(ArgAction::SetTrue)
                        .help("Issue one lookup at a time"),
                )
                .arg(
                    Arg::new("fail_fast")
                        .long("fail-fast")
                        .action(ArgAction::SetTrue)
                        .help("Stop at the first failed lookup instead of recording it"),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
}
