//! L2-regularized logistic regression fitted by full-batch gradient descent.

use ndarray::{Array1, Array2, ArrayView1};
use rew_common::{Error, Result};
use rew_config::LogisticRegressionParams;
use rew_math::{log_loss, sigmoid};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fitted weights on standardized features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

/// Outcome of one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Fit {
    pub model: LogisticRegression,
    pub iterations: usize,
    pub converged: bool,
    /// Final regularized objective.
    pub loss: f64,
}

impl LogisticRegression {
    fn zeros(width: usize) -> Self {
        Self {
            coefficients: Array1::zeros(width),
            intercept: 0.0,
        }
    }

    pub fn decision(&self, row: ArrayView1<f64>) -> f64 {
        row.dot(&self.coefficients) + self.intercept
    }

    pub fn decision_function(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }

    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        sigmoid(self.decision(row))
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        self.decision_function(x).mapv(sigmoid)
    }

    /// Minimize `mean log-loss + ‖w‖² / (2·C·n)`; the intercept is not
    /// penalized. Stops when the objective changes by less than `tolerance`.
    pub fn fit(x: &Array2<f64>, y: &Array1<u8>, params: &LogisticRegressionParams) -> Result<Fit> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(Error::Training(format!(
                "need matching non-empty inputs, got {} rows and {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if !(params.c > 0.0) {
            return Err(Error::InvalidConfig(format!("C must be positive, got {}", params.c)));
        }

        let n = x.nrows() as f64;
        let targets = y.mapv(f64::from);
        let penalty = 1.0 / (params.c * n);

        let mut model = Self::zeros(x.ncols());
        let mut previous = f64::INFINITY;
        let mut loss = previous;
        let mut converged = false;
        let mut iterations = 0;

        for iter in 1..=params.max_iter {
            iterations = iter;
            let preds = model.predict_proba(x);
            let norm = model.coefficients.dot(&model.coefficients);
            loss = log_loss(&targets, &preds) + 0.5 * penalty * norm;

            let errors = &preds - &targets;
            let grad_w = x.t().dot(&errors) / n + &model.coefficients * penalty;
            let grad_b = errors.sum() / n;

            model.coefficients.scaled_add(-params.learning_rate, &grad_w);
            model.intercept -= params.learning_rate * grad_b;

            if (previous - loss).abs() < params.tolerance {
                converged = true;
                break;
            }
            previous = loss;
        }

        if converged {
            debug!(iterations, loss, "logistic regression converged");
        } else {
            warn!(
                iterations,
                loss,
                "logistic regression stopped at max_iter without converging"
            );
        }
        Ok(Fit {
            model,
            iterations,
            converged,
            loss,
        })
    }
}
