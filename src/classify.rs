use std::collections::HashMap;
use std::error::Error;

use aprender::classification::{KNearestNeighbors, LinearSVM, LogisticRegression};
use aprender::metrics::classification::accuracy;
use aprender::preprocessing::StandardScaler;
use aprender::primitives::Matrix;
use aprender::traits::Transformer;
use aprender::tree::RandomForestClassifier;
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::buckets::{bucket_totals, NUM_RT_BUCKETS};

const FOREST_TREES: usize = 100;
const NEAREST_NEIGHBORS: usize = 15;

/// The classifiers the evaluation engine can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    RandomForest,
    Svm,
    Logistic,
    KNearest,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 4] = [
        ClassifierKind::RandomForest,
        ClassifierKind::Svm,
        ClassifierKind::Logistic,
        ClassifierKind::KNearest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClassifierKind::RandomForest => "Random Forest",
            ClassifierKind::Svm => "Linear SVM",
            ClassifierKind::Logistic => "Logistic Regression",
            ClassifierKind::KNearest => "K Neighbors",
        }
    }

    pub fn from_name(name: &str) -> Option<ClassifierKind> {
        match name {
            "forest" => Some(ClassifierKind::RandomForest),
            "svm" => Some(ClassifierKind::Svm),
            "logistic" => Some(ClassifierKind::Logistic),
            "nearest" => Some(ClassifierKind::KNearest),
            _ => None,
        }
    }

    fn build(self) -> Box<dyn BucketClassifier> {
        match self {
            ClassifierKind::RandomForest => Box::new(ForestModel {
                forest: RandomForestClassifier::new(FOREST_TREES),
            }),
            ClassifierKind::Svm => Box::new(OneVsRest::new(LinearSVM::new())),
            ClassifierKind::Logistic => Box::new(OneVsRest::new(LogisticRegression::new())),
            ClassifierKind::KNearest => Box::new(NearestModel {
                model: KNearestNeighbors::new(NEAREST_NEIGHBORS),
            }),
        }
    }
}

/// What a classifier has to provide to plug into the evaluation engine.
/// The implementations delegate all learning to the library models.
pub trait BucketClassifier {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<(), Box<dyn Error>>;
    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>, Box<dyn Error>>;

    fn score(&self, x: &Matrix<f32>, y: &[usize]) -> Result<f32, Box<dyn Error>> {
        Ok(accuracy(&self.predict(x)?, y))
    }

    fn feature_importances(&self) -> Option<Vec<f32>> {
        None
    }
}

struct ForestModel {
    forest: RandomForestClassifier,
}

impl BucketClassifier for ForestModel {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<(), Box<dyn Error>> {
        self.forest.fit(x, y)?;
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>, Box<dyn Error>> {
        Ok(self.forest.predict(x))
    }

    fn score(&self, x: &Matrix<f32>, y: &[usize]) -> Result<f32, Box<dyn Error>> {
        Ok(self.forest.score(x, y))
    }

    fn feature_importances(&self) -> Option<Vec<f32>> {
        self.forest.feature_importances()
    }
}

struct NearestModel {
    model: KNearestNeighbors,
}

impl BucketClassifier for NearestModel {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<(), Box<dyn Error>> {
        self.model.fit(x, y)?;
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>, Box<dyn Error>> {
        Ok(self.model.predict(x)?)
    }
}

/// A binary model that can be lifted to the four buckets one-vs-rest.
trait BinaryScorer: Clone {
    fn fit_binary(&mut self, x: &Matrix<f32>, y: &[usize]) -> aprender::error::Result<()>;
    fn decision(&self, x: &Matrix<f32>) -> aprender::error::Result<Vec<f32>>;
}

impl BinaryScorer for LinearSVM {
    fn fit_binary(&mut self, x: &Matrix<f32>, y: &[usize]) -> aprender::error::Result<()> {
        self.fit(x, y)
    }

    fn decision(&self, x: &Matrix<f32>) -> aprender::error::Result<Vec<f32>> {
        self.decision_function(x)
    }
}

impl BinaryScorer for LogisticRegression {
    fn fit_binary(&mut self, x: &Matrix<f32>, y: &[usize]) -> aprender::error::Result<()> {
        self.fit(x, y)
    }

    fn decision(&self, x: &Matrix<f32>) -> aprender::error::Result<Vec<f32>> {
        Ok(self.predict_proba(x).as_slice().to_vec())
    }
}

/// One-vs-rest lift of a binary classifier: one model per bucket, each
/// trained on "this bucket against everything else"; prediction takes the
/// bucket whose model scores highest.
struct OneVsRest<M: BinaryScorer> {
    template: M,
    models: Vec<M>,
}

impl<M: BinaryScorer> OneVsRest<M> {
    fn new(template: M) -> OneVsRest<M> {
        OneVsRest {
            template,
            models: Vec::new(),
        }
    }
}

impl<M: BinaryScorer + 'static> BucketClassifier for OneVsRest<M> {
    fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<(), Box<dyn Error>> {
        self.models.clear();
        for bucket in 0..NUM_RT_BUCKETS {
            let targets: Vec<usize> = y.iter().map(|&v| usize::from(v == bucket)).collect();
            let mut model = self.template.clone();
            model.fit_binary(x, &targets)?;
            self.models.push(model);
        }
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>, Box<dyn Error>> {
        if self.models.is_empty() {
            return Err("classifier not fitted".into());
        }
        let mut scores = Vec::with_capacity(self.models.len());
        for model in &self.models {
            scores.push(model.decision(x)?);
        }
        let samples = x.n_rows();
        let mut predictions = Vec::with_capacity(samples);
        for i in 0..samples {
            let bucket = (0..self.models.len())
                .position_max_by_key(|&bucket| OrderedFloat(scores[bucket][i]))
                .unwrap_or(0);
            predictions.push(bucket);
        }
        Ok(predictions)
    }
}

/// Fits a standard scaler on the training features only and applies it to
/// both splits. The scaler is never refit on test data.
pub fn scale_features(
    train: &Matrix<f32>,
    test: &Matrix<f32>,
) -> Result<(Matrix<f32>, Matrix<f32>), Box<dyn Error>> {
    let mut scaler = StandardScaler::new();
    scaler.fit(train)?;
    Ok((scaler.transform(train)?, scaler.transform(test)?))
}

/// Confusion matrix over the sorted union of buckets observed in the true
/// and predicted labels. Buckets absent from both are not given rows or
/// columns, which is what the bucketDif offset in `bucket_metrics`
/// compensates for.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize]) -> Vec<Vec<usize>> {
    let mut labels: Vec<usize> = y_true.iter().chain(y_pred.iter()).copied().collect();
    labels.sort_unstable();
    labels.dedup();
    let positions: HashMap<usize, usize> = labels
        .iter()
        .enumerate()
        .map(|(position, &label)| (label, position))
        .collect();

    let mut matrix = vec![vec![0; labels.len()]; labels.len()];
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        matrix[positions[&t]][positions[&p]] += 1;
    }
    matrix
}

#[derive(Debug, Clone)]
pub struct BucketMetrics {
    pub precision: [f64; NUM_RT_BUCKETS],
    pub recall: [f64; NUM_RT_BUCKETS],
    pub f_score: [f64; NUM_RT_BUCKETS],
}

/// Per-bucket precision, recall and F-score from a compacted confusion
/// matrix.
///
/// A bucket with no tweets in the test labels gets precision = recall = 1
/// by convention and bumps the bucketDif offset, so later buckets index the
/// matrix at their position minus the number of empty buckets seen so far.
/// The offset assumes empty buckets are also absent from the predictions;
/// when a model predicts into an empty bucket the matrix keeps that column
/// and lookups for later buckets shift off target. That lookup can land on
/// a row with no observations, in which case recall's divisor would be 0
/// and it takes the same convention as precision.
pub fn bucket_metrics(
    matrix: &[Vec<usize>],
    totals: &[usize; NUM_RT_BUCKETS],
) -> BucketMetrics {
    let mut precision = [0.0; NUM_RT_BUCKETS];
    let mut recall = [0.0; NUM_RT_BUCKETS];
    let mut f_score = [0.0; NUM_RT_BUCKETS];

    let mut bucket_dif = 0;
    for bucket in 0..NUM_RT_BUCKETS {
        if totals[bucket] == 0 {
            precision[bucket] = 1.0;
            recall[bucket] = 1.0;
            bucket_dif += 1;
        } else {
            let k = bucket - bucket_dif;
            let true_positive = matrix[k][k] as f64;
            let test_positive: usize = matrix.iter().map(|row| row[k]).sum();
            let condition_positive: usize = matrix[k].iter().sum();
            precision[bucket] = if test_positive != 0 {
                true_positive / test_positive as f64
            } else {
                1.0
            };
            recall[bucket] = if condition_positive != 0 {
                true_positive / condition_positive as f64
            } else {
                1.0
            };
        }
        let p = precision[bucket];
        let r = recall[bucket];
        f_score[bucket] = if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        };
    }

    BucketMetrics {
        precision,
        recall,
        f_score,
    }
}

/// Everything the evaluation of one classifier produces. Printing is the
/// driver's business.
pub struct Evaluation {
    pub classifier: &'static str,
    pub score: f32,
    pub importances: Option<Vec<(String, f32)>>,
    pub bucket_totals: [usize; NUM_RT_BUCKETS],
    pub confusion: Vec<Vec<usize>>,
    pub metrics: BucketMetrics,
}

/// Fits the selected classifier on the (already scaled) training split and
/// derives score, confusion matrix and per-bucket metrics on the test
/// split.
pub fn evaluate(
    kind: ClassifierKind,
    x_train: &Matrix<f32>,
    y_train: &[usize],
    x_test: &Matrix<f32>,
    y_test: &[usize],
    feature_names: &[String],
) -> Result<Evaluation, Box<dyn Error>> {
    let mut model = kind.build();
    model.fit(x_train, y_train)?;
    let score = model.score(x_test, y_test)?;
    let prediction = model.predict(x_test)?;

    let totals = bucket_totals(y_test);
    let confusion = confusion_matrix(y_test, &prediction);
    let metrics = bucket_metrics(&confusion, &totals);
    let importances = model.feature_importances().map(|weights| {
        feature_names
            .iter()
            .cloned()
            .zip(weights)
            .collect::<Vec<(String, f32)>>()
    });

    Ok(Evaluation {
        classifier: kind.name(),
        score,
        importances,
        bucket_totals: totals,
        confusion,
        metrics,
    })
}
