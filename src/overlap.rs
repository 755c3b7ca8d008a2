use std::collections::BTreeSet;

use crate::error::{RegistrationError, Result};

fn check_len<T, U>(truth: &[T], predicted: &[U]) -> Result<()> {
    if truth.len() != predicted.len() {
        return Err(RegistrationError::shape_mismatch(
            &[truth.len()],
            &[predicted.len()],
        ));
    }
    Ok(())
}

/// Dice coefficient `2 |A ∩ B| / (|A| + |B|)` of two binary masks.
/// Two empty masks agree perfectly and score 1.
pub fn dice(truth: &[bool], predicted: &[bool]) -> Result<f64> {
    check_len(truth, predicted)?;
    let both = truth.iter().zip(predicted).filter(|&(&t, &p)| t && p).count();
    let total = truth.iter().filter(|&&t| t).count() + predicted.iter().filter(|&&p| p).count();
    if total == 0 {
        return Ok(1.);
    }
    Ok(2. * both as f64 / total as f64)
}

/// Mean Dice over every class present in `truth`, each taken as foreground
pub fn dice_multiclass<T: Ord + Copy>(truth: &[T], predicted: &[T]) -> Result<f64> {
    check_len(truth, predicted)?;
    let classes: BTreeSet<T> = truth.iter().copied().collect();
    if classes.is_empty() {
        return Ok(1.);
    }

    let mut sum = 0.;
    for class in &classes {
        let t: Vec<bool> = truth.iter().map(|v| v == class).collect();
        let p: Vec<bool> = predicted.iter().map(|v| v == class).collect();
        sum += dice(&t, &p)?;
    }
    Ok(sum / classes.len() as f64)
}

/// Fraction of mislabeled samples
pub fn classification_error<T: PartialEq>(truth: &[T], predicted: &[T]) -> Result<f64> {
    check_len(truth, predicted)?;
    if truth.is_empty() {
        return Ok(0.);
    }
    let wrong = truth.iter().zip(predicted).filter(|(t, p)| t != p).count();
    Ok(wrong as f64 / truth.len() as f64)
}
