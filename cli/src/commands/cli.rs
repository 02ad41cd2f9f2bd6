use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "querysmith", version, about = "Natural-language to read-only query synthesis")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub source_url: Option<String>,

    #[arg(long, global = true)]
    pub source_api_key: Option<String>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct QueryArgs {
    /// What data to return, in plain language.
    pub description: String,

    /// Table to ground the query on. Can be specified multiple times.
    #[arg(long = "table", short = 't', action = clap::ArgAction::Append)]
    pub tables: Vec<String>,

    /// Validate the generated plan without executing it.
    #[arg(long)]
    pub plan_only: bool,

    /// Always introspect the live schema.
    #[arg(long)]
    pub no_snapshot: bool,

    /// Previously saved field index (see `discover --save-index`).
    #[arg(long)]
    pub field_index: Option<String>,

    /// Let the model call schema tools while generating.
    #[arg(long)]
    pub tools: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MapArgs {
    /// Target table the CSV columns are mapped onto.
    #[arg(long)]
    pub table: String,

    /// Local CSV file.
    #[arg(long, group = "input")]
    pub csv: Option<String>,

    /// Attachment reference: http(s) URL, base64 data URL or plain base64.
    #[arg(long, group = "input")]
    pub attachment: Option<String>,

    /// First row is data, not a header.
    #[arg(long)]
    pub no_header: bool,

    #[arg(long)]
    pub delimiter: Option<char>,

    #[arg(long)]
    pub no_snapshot: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DiscoverArgs {
    #[arg(long = "table", short = 't', required = true, action = clap::ArgAction::Append)]
    pub tables: Vec<String>,

    #[arg(long)]
    pub no_snapshot: bool,

    /// Embed every discovered field and write the index to this path.
    #[arg(long)]
    pub save_index: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate, validate and run a read-only query.
    Query(QueryArgs),
    /// Map CSV columns onto the fields of a table.
    Map(MapArgs),
    /// Introspect tables and refresh the schema snapshot.
    Discover(DiscoverArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_query_with_tables() {
        let args = Args::try_parse_from([
            "querysmith",
            "query",
            "accounts in tech",
            "--table",
            "Account",
            "-t",
            "Contact",
            "--plan-only",
        ])
        .unwrap();
        let Commands::Query(query) = args.command else {
            panic!("expected query command");
        };
        assert_eq!(query.tables, vec!["Account", "Contact"]);
        assert!(query.plan_only);
        assert!(!query.no_snapshot);
    }

    #[test]
    fn test_map_inputs_are_exclusive() {
        let parsed = Args::try_parse_from([
            "querysmith",
            "map",
            "--table",
            "Contact",
            "--csv",
            "a.csv",
            "--attachment",
            "YQ==",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_discover_requires_table() {
        assert!(Args::try_parse_from(["querysmith", "discover"]).is_err());
    }
}
