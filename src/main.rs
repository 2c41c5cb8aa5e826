mod buckets;
mod classify;
mod command_line_args;
mod features;
mod itemizer;
mod itemsets;
mod sample_reader;
mod topic_index;

use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::process;
use std::time::Instant;

use buckets::{bucket_totals, split_buckets};
use classify::{evaluate, scale_features, ClassifierKind, Evaluation};
use command_line_args::{parse_args_or_exit, Arguments};
use features::{feature_matrix, feature_names};
use itemsets::{mine_bucket_partitions, tweet_tags, MinedGroup};
use sample_reader::read_sample;
use topic_index::TopicIndex;

fn print_evaluation(evaluation: &Evaluation) {
    println!("{}", evaluation.classifier);
    println!("Score: {}", evaluation.score);
    if let Some(importances) = &evaluation.importances {
        println!("Importances: ");
        for (name, weight) in importances {
            println!("    {}: {}", name, weight);
        }
    }
    println!("Confusion matrix: ");
    for row in &evaluation.confusion {
        println!("{:?}", row);
    }
    println!("Precision: {:?}", evaluation.metrics.precision);
    println!("Recall: {:?}", evaluation.metrics.recall);
    println!("F-score: {:?}", evaluation.metrics.f_score);
    println!();
}

fn classification_reports(args: &Arguments) -> Result<(), Box<dyn Error>> {
    let kinds: Vec<ClassifierKind> = match args.classifier {
        Some(kind) => vec![kind],
        None => ClassifierKind::ALL.to_vec(),
    };

    // Each resolution uses one more period of engagement history: the
    // tweet's first 15, 30 and 45 minutes.
    for periods in 1u32..=3 {
        let minimum_periods = periods + 1;
        println!(
            "Classifying with {} periods of history ({} minutes)",
            periods,
            periods * 15
        );

        let timer = Instant::now();
        let mut topics = TopicIndex::new();
        let training = BufReader::new(File::open(&args.training_file_path)?);
        let (train_records, y_train) = read_sample(training, minimum_periods, Some(&mut topics))?;
        let test = BufReader::new(File::open(&args.test_file_path)?);
        let (test_records, y_test) = read_sample(test, minimum_periods, None)?;
        println!(
            "Parsed {} training and {} test tweets in {} seconds.",
            train_records.len(),
            test_records.len(),
            timer.elapsed().as_secs()
        );

        let x_train = feature_matrix(&train_records, &topics)?;
        let x_test = feature_matrix(&test_records, &topics)?;
        let train_buckets = split_buckets(&y_train);
        let test_buckets = split_buckets(&y_test);
        println!(
            "Tweets per retweet bucket: {:?}",
            bucket_totals(&test_buckets)
        );
        println!();

        let (x_train, x_test) = scale_features(&x_train, &x_test)?;
        let names = feature_names(minimum_periods);

        for &kind in &kinds {
            let evaluation = evaluate(
                kind,
                &x_train,
                &train_buckets,
                &x_test,
                &test_buckets,
                &names,
            )?;
            print_evaluation(&evaluation);
        }
        println!();
    }
    Ok(())
}

fn write_itemset_report<W: Write>(out: &mut W, groups: &[MinedGroup]) -> io::Result<()> {
    for group in groups {
        writeln!(out, "{}", group.label)?;
        writeln!(out, "Length = {}", group.transaction_count)?;
        for (tags, support) in &group.itemsets {
            writeln!(out, "{}, {}", tags.join(" | "), support)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn mining_reports(args: &Arguments) -> Result<(), Box<dyn Error>> {
    let timer = Instant::now();

    // The mining path reads every record, whatever its observed history,
    // over both splits combined.
    let training = BufReader::new(File::open(&args.training_file_path)?);
    let (mut records, mut labels) = read_sample(training, 1, None)?;
    let test = BufReader::new(File::open(&args.test_file_path)?);
    let (test_records, test_labels) = read_sample(test, 1, None)?;
    records.extend(test_records);
    labels.extend(test_labels);

    let transactions: Vec<Vec<String>> = records.iter().map(tweet_tags).collect();
    let bucket_labels = split_buckets(&labels);

    let groups = mine_bucket_partitions(&transactions, &bucket_labels, args.min_support);
    println!(
        "Mined frequent itemsets of {} tweets in {} seconds.",
        transactions.len(),
        timer.elapsed().as_secs()
    );
    println!();

    if args.itemsets_output_path.is_empty() {
        write_itemset_report(&mut io::stdout().lock(), &groups)?;
    } else {
        let mut output = BufWriter::new(File::create(&args.itemsets_output_path)?);
        write_itemset_report(&mut output, &groups)?;
        println!("Wrote itemsets to {}", args.itemsets_output_path);
    }
    Ok(())
}

fn run(args: &Arguments) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    classification_reports(args)?;
    mining_reports(args)?;
    println!("Total runtime: {} seconds", start.elapsed().as_secs());
    Ok(())
}

fn main() {
    let arguments = parse_args_or_exit();

    if let Err(err) = run(&arguments) {
        println!("Error: {}", err);
        process::exit(1);
    }
}
