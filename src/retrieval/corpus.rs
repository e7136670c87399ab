//! Knowledge corpus loading, seeding, and fingerprinting.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{Error, Result};

/// A reference document loaded from the corpus directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path relative to the corpus root, `/`-separated.
    pub name: String,
    /// Full document text.
    pub content: String,
}

/// Built-in reference documents written by [`seed`].
const SEED_DOCUMENTS: [(&str, &str); 4] = [
    (
        "algebra_formulas.txt",
        "Quadratic Formula: For a*x^2 + b*x + c = 0, x = (-b +- sqrt(b^2 - 4ac)) / 2a\n\
         Discriminant: b^2 - 4ac determines the nature of roots\n\
         If b^2 - 4ac > 0: Two distinct real roots\n\
         If b^2 - 4ac = 0: One repeated real root\n\
         If b^2 - 4ac < 0: Two complex conjugate roots\n\
         \n\
         Factorization: x^2 + (a+b)x + ab = (x+a)(x+b)\n\
         Difference of squares: a^2 - b^2 = (a+b)(a-b)\n\
         Perfect square: a^2 + 2ab + b^2 = (a+b)^2\n\
         \n\
         Binomial Theorem: (a+b)^n = sum(nCr * a^(n-r) * b^r) where r goes from 0 to n\n\
         Exponent rules: a^m * a^n = a^(m+n), a^m / a^n = a^(m-n), (a^m)^n = a^(m*n)\n",
    ),
    (
        "calculus_formulas.txt",
        "Derivative Rules:\n\
         - Power Rule: d/dx(x^n) = n*x^(n-1)\n\
         - Constant Rule: d/dx(c) = 0\n\
         - Sum Rule: d/dx(f+g) = f' + g'\n\
         - Product Rule: d/dx(u*v) = u*(dv/dx) + v*(du/dx)\n\
         - Quotient Rule: d/dx(u/v) = (v*(du/dx) - u*(dv/dx)) / v^2\n\
         - Chain Rule: d/dx(f(g(x))) = f'(g(x)) * g'(x)\n\
         \n\
         Common Derivatives:\n\
         - d/dx(sin x) = cos x\n\
         - d/dx(cos x) = -sin x\n\
         - d/dx(e^x) = e^x\n\
         - d/dx(ln x) = 1/x\n\
         \n\
         Limits:\n\
         - lim(x->0) sin(x)/x = 1\n\
         - lim(x->0) (1 - cos(x))/x = 0\n\
         - lim(x->infinity) (1 + 1/x)^x = e\n\
         - lim(x->0) (e^x - 1)/x = 1\n\
         \n\
         Integration Rules:\n\
         - integral of x^n dx = x^(n+1)/(n+1) + C, where n != -1\n\
         - integral of 1/x dx = ln|x| + C\n\
         - integral of e^x dx = e^x + C\n\
         - integral of sin x dx = -cos x + C\n\
         - integral of cos x dx = sin x + C\n",
    ),
    (
        "probability_formulas.txt",
        "Probability Basics:\n\
         - P(A or B) = P(A) + P(B) - P(A and B) (Addition rule)\n\
         - P(A and B) = P(A) * P(B) if A and B are independent\n\
         - P(A|B) = P(A and B) / P(B) (Conditional probability)\n\
         - P(not A) = 1 - P(A) (Complement rule)\n\
         \n\
         Bayes Theorem: P(A|B) = P(B|A) * P(A) / P(B)\n\
         \n\
         Permutations: nPr = n! / (n-r)!\n\
         - Number of ways to arrange r items from n items (order matters)\n\
         \n\
         Combinations: nCr = n! / (r! * (n-r)!)\n\
         - Number of ways to choose r items from n items (order doesn't matter)\n\
         \n\
         Expected Value: E(X) = sum(x * P(x)) for discrete random variables\n\
         Variance: Var(X) = E(X^2) - [E(X)]^2\n\
         Standard Deviation: sigma = sqrt(Var(X))\n\
         \n\
         Binomial Distribution: P(X=k) = nCk * p^k * (1-p)^(n-k)\n\
         - n trials, probability p of success, k successes\n",
    ),
    (
        "linear_algebra_formulas.txt",
        "Matrix Operations:\n\
         - Matrix addition: Add corresponding elements\n\
         - Matrix multiplication: (AB)_ij = sum(A_ik * B_kj)\n\
         - Transpose: (A^T)_ij = A_ji\n\
         - Identity matrix: I * A = A * I = A\n\
         \n\
         Determinant (2x2): |A| = ad - bc for A = [[a, b], [c, d]]\n\
         Determinant (3x3): Use cofactor expansion\n\
         \n\
         Matrix Inverse: A^-1 exists if det(A) != 0\n\
         - A * A^-1 = A^-1 * A = I\n\
         - For 2x2: A^-1 = (1/det(A)) * [[d, -b], [-c, a]]\n\
         \n\
         System of Linear Equations:\n\
         - AX = B can be solved as X = A^-1 * B (if A^-1 exists)\n\
         - Cramer's rule: x_i = det(A_i)/det(A)\n\
         \n\
         Eigenvalues and Eigenvectors:\n\
         - AV = lambda*V where lambda is eigenvalue, V is eigenvector\n\
         - Find lambda by solving det(A - lambda*I) = 0\n",
    ),
];

/// Loads every `.txt` document under `root`, sorted by name.
///
/// Unreadable entries are skipped with a warning; the walk itself never
/// fails on individual files. A missing root yields an empty list.
#[must_use]
pub fn load_documents(root: &Path) -> Vec<Document> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable corpus entry");
                continue;
            },
        };
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("txt") {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable corpus document"
                );
                continue;
            },
        };

        let name = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        documents.push(Document { name, content });
    }

    documents.sort_by(|a, b| a.name.cmp(&b.name));
    documents
}

/// Writes the built-in reference documents into `root`.
///
/// Existing files are left untouched. Returns the paths that were created.
///
/// # Errors
///
/// Returns an error if the directory or a missing document cannot be
/// written.
pub fn seed(root: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(root).map_err(|e| Error::OperationFailed {
        operation: "create_corpus_dir".to_string(),
        cause: format!("{}: {}", root.display(), e),
    })?;

    let mut created = Vec::new();
    for (name, content) in SEED_DOCUMENTS {
        let path = root.join(name);
        if path.exists() {
            continue;
        }
        std::fs::write(&path, content).map_err(|e| Error::OperationFailed {
            operation: "write_seed_document".to_string(),
            cause: format!("{}: {}", path.display(), e),
        })?;
        created.push(path);
    }

    tracing::info!(
        root = %root.display(),
        created = created.len(),
        "Seeded knowledge corpus"
    );
    Ok(created)
}

/// Stable fingerprint of a document set.
///
/// SHA-256 over (name, content) pairs in name order, hex-encoded. Used to
/// detect a corpus that changed since the index was built.
#[must_use]
pub fn fingerprint(documents: &[Document]) -> String {
    let mut sorted: Vec<&Document> = documents.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut hasher = Sha256::new();
    for document in sorted {
        hasher.update(document.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(document.content.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
