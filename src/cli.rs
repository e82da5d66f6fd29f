use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON config file. Built-in defaults are used when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Detect objects in the image and its mirror, then merge the results
    Detect {
        /// Image file, or a directory searched for jpg/jpeg/png files
        #[arg(long, required = true)]
        source: PathBuf,

        /// Directory for annotated frames and JSON reports
        #[arg(long, default_value = "output")]
        output: PathBuf,

        /// Overrides the configured confidence threshold
        #[arg(long)]
        confidence: Option<f32>,

        /// Overrides the configured IoU threshold
        #[arg(long)]
        iou: Option<f32>,

        /// Run only the plain pass, without the mirrored one
        #[arg(long)]
        single_view: bool,
    },
    /// Label whole images with the secondary classifier
    Classify {
        /// Image file, or a directory searched for jpg/jpeg/png files
        #[arg(long, required = true)]
        source: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detect_with_overrides() {
        let args = Args::parse_from([
            "dual-view-fusion",
            "detect",
            "--source",
            "uploads",
            "--confidence",
            "0.05",
            "--single-view",
            "--config",
            "config.json",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("config.json")));
        match args.command {
            Command::Detect {
                source,
                output,
                confidence,
                iou,
                single_view,
            } => {
                assert_eq!(source, PathBuf::from("uploads"));
                assert_eq!(output, PathBuf::from("output"));
                assert_eq!(confidence, Some(0.05));
                assert_eq!(iou, None);
                assert!(single_view);
            }
            Command::Classify { .. } => panic!("expected detect"),
        }
    }

    #[test]
    fn source_is_required() {
        assert!(Args::try_parse_from(["dual-view-fusion", "classify"]).is_err());
    }
}
