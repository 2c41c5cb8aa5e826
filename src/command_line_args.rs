use std::env;
use std::io;
use std::process;

use argparse::{ArgumentParser, Store};

use crate::classify::ClassifierKind;
use crate::itemsets::DEFAULT_MIN_SUPPORT;

pub struct Arguments {
    pub training_file_path: String,
    pub test_file_path: String,
    pub classifier: Option<ClassifierKind>,
    pub min_support: u32,
    pub itemsets_output_path: String,
}

pub fn parse_args_or_exit() -> Arguments {
    let mut args: Arguments = Arguments {
        training_file_path: String::new(),
        test_file_path: String::new(),
        classifier: None,
        min_support: DEFAULT_MIN_SUPPORT,
        itemsets_output_path: String::new(),
    };

    let mut classifier: String = String::new();
    {
        let mut parser = ArgumentParser::new();
        parser.set_description(
            "Retweet-bucket classifier and tweet attribute frequent-itemset miner.",
        );

        parser
            .refer(&mut args.training_file_path)
            .add_option(
                &["--training"],
                Store,
                "Training sample in the multi-line tweet record format.",
            )
            .metavar("file_path")
            .required();

        parser
            .refer(&mut args.test_file_path)
            .add_option(
                &["--test"],
                Store,
                "Test sample in the multi-line tweet record format.",
            )
            .metavar("file_path")
            .required();

        parser.refer(&mut classifier).add_option(
            &["--classifier"],
            Store,
            "Classifier to evaluate, one of 'forest', 'svm', 'logistic' or \
             'nearest'. All four run when omitted.",
        );

        parser
            .refer(&mut args.min_support)
            .add_option(
                &["--min-support"],
                Store,
                "Minimum number of tweets an itemset must occur in to be reported.",
            )
            .metavar("count");

        parser
            .refer(&mut args.itemsets_output_path)
            .add_option(
                &["--itemsets-output"],
                Store,
                "File path in which to store mined itemsets. Printed to stdout \
                 when omitted.",
            )
            .metavar("file_path");

        if env::args().count() == 1 {
            parser.print_help("Usage:", &mut io::stderr()).unwrap();
            process::exit(1);
        }

        match parser.parse_args() {
            Ok(()) => {}
            Err(err) => {
                process::exit(err);
            }
        }
    }

    if !classifier.is_empty() {
        args.classifier = match ClassifierKind::from_name(&classifier) {
            Some(kind) => Some(kind),
            None => {
                eprintln!(
                    "Error: --classifier must be one of 'forest', 'svm', 'logistic' or 'nearest'"
                );
                process::exit(1);
            }
        };
    }

    if args.min_support == 0 {
        eprintln!("Minimum itemset support must be at least 1");
        process::exit(1);
    }

    args
}
