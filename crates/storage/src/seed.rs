use quiz_core::model::{Difficulty, QuestionDraft, QuestionError};
use thiserror::Error;

use crate::repository::{QuestionRepository, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Starter catalog inserted into an empty database.
#[must_use]
pub fn default_catalog() -> Vec<QuestionDraft> {
    use Difficulty::{Easy, Hard, Medium};

    vec![
        QuestionDraft::new(
            "Mathematics",
            "Algebra",
            Easy,
            "What is 2 + 2?",
            ["4", "3", "5", "22"],
            "4",
        ),
        QuestionDraft::new(
            "Mathematics",
            "Algebra",
            Medium,
            "Solve for x: 2x+3=11",
            ["4", "3", "2", "8"],
            "4",
        ),
        QuestionDraft::new(
            "Science",
            "Physics",
            Easy,
            "What force keeps us on the ground?",
            ["Magnetism", "Gravity", "Friction", "Tension"],
            "Gravity",
        ),
        QuestionDraft::new(
            "Science",
            "Biology",
            Hard,
            "Which organelle is the powerhouse of the cell?",
            ["Nucleus", "Mitochondria", "Ribosome", "Golgi apparatus"],
            "Mitochondria",
        ),
        QuestionDraft::new(
            "Computers",
            "Programming",
            Medium,
            "Which language is primarily used for web pages?",
            ["Python", "C", "JavaScript", "Fortran"],
            "JavaScript",
        ),
        QuestionDraft::new(
            "General Knowledge",
            "History",
            Easy,
            "Who was the first President of the United States?",
            [
                "Abraham Lincoln",
                "George Washington",
                "Thomas Jefferson",
                "John Adams",
            ],
            "George Washington",
        ),
        QuestionDraft::new(
            "Anime",
            "Characters",
            Easy,
            "Which anime features a character named Naruto?",
            ["One Piece", "Naruto", "Bleach", "Dragon Ball"],
            "Naruto",
        ),
        QuestionDraft::new(
            "Anime",
            "Trivia",
            Medium,
            "In 'My Neighbor Totoro', who are the main child characters?",
            [
                "Satsuki & Mei",
                "Ash & Pikachu",
                "Chihiro & Haku",
                "Edward & Alphonse",
            ],
            "Satsuki & Mei",
        ),
    ]
}

/// Insert `drafts` only when the catalog has no questions yet.
///
/// Every draft is validated before the first insert, so a bad draft leaves
/// the catalog untouched. Returns the number of inserted questions.
///
/// # Errors
///
/// Returns `SeedError` if a draft is invalid or storage fails.
pub async fn seed_if_empty(
    repo: &dyn QuestionRepository,
    drafts: Vec<QuestionDraft>,
) -> Result<usize, SeedError> {
    if repo.count_questions().await? > 0 {
        return Ok(0);
    }

    let validated = drafts
        .into_iter()
        .map(QuestionDraft::validate)
        .collect::<Result<Vec<_>, _>>()?;
    let inserted = validated.len();
    for question in validated {
        repo.insert_question(question).await?;
    }
    tracing::info!(inserted, "seeded question catalog");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    #[test]
    fn default_catalog_is_valid() {
        for draft in default_catalog() {
            draft.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn seeds_only_once() {
        let repo = InMemoryRepository::new();
        assert_eq!(seed_if_empty(&repo, default_catalog()).await.unwrap(), 8);
        assert_eq!(seed_if_empty(&repo, default_catalog()).await.unwrap(), 0);
        assert_eq!(repo.count_questions().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn invalid_draft_inserts_nothing() {
        let repo = InMemoryRepository::new();
        let mut drafts = default_catalog();
        drafts[3].answer = "Chloroplast".into();
        let err = seed_if_empty(&repo, drafts).await.unwrap_err();
        assert!(matches!(err, SeedError::Question(_)));
        assert_eq!(repo.count_questions().await.unwrap(), 0);
    }
}
