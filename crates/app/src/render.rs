use chrono::Duration;

use quiz_core::model::{QuestionFilter, QuestionOutcome, QuizResult, QuizSession, TimeRemaining, UserId};
use services::{LeaderboardEntry, SessionView};

/// `mm:ss`, or `--:--` for untimed sessions.
pub fn clock_label(remaining: TimeRemaining) -> String {
    match remaining {
        TimeRemaining::Unlimited => "--:--".to_string(),
        TimeRemaining::Limited(left) => {
            let secs = left.num_seconds().max(0);
            format!("{:02}:{:02}", secs / 60, secs % 60)
        }
    }
}

pub fn filter_label(filter: &QuestionFilter) -> String {
    let parts = [
        filter.subject.as_deref().unwrap_or("Any subject").to_string(),
        filter.category.as_deref().unwrap_or("Any category").to_string(),
        filter
            .difficulty
            .map_or_else(|| "Any difficulty".to_string(), |d| d.to_string()),
    ];
    parts.join(" / ")
}

fn elapsed_label(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{}m {:02}s", secs / 60, secs % 60)
}

pub fn question(view: &SessionView) {
    println!();
    println!(
        "Question {}/{}  [{} / {} / {}]  answered {}  time left {}",
        view.position(),
        view.progress.total,
        view.subject,
        view.category,
        view.difficulty,
        view.progress.answered,
        clock_label(view.time_remaining),
    );
    println!("{}", view.prompt);
    for (idx, choice) in view.choices.iter().enumerate() {
        let marker = if view.selected.as_deref() == Some(choice.as_str()) {
            '*'
        } else {
            ' '
        };
        println!("  {marker} {}) {choice}", idx + 1);
    }
    println!("[1-{}] answer  n next  p prev  c clear  s submit  q quit", view.choices.len());
}

pub fn result(session: &QuizSession, result: &QuizResult) {
    println!();
    println!(
        "Quiz {}: {}/{} correct ({:.2}%) in {}",
        result.outcome().as_str(),
        result.score(),
        result.total(),
        result.percentage(),
        elapsed_label(result.elapsed()),
    );
    for (question, outcome) in session.questions().iter().zip(session.review()) {
        println!("{} {}", outcome_mark(&outcome), question.prompt());
        if !outcome.is_correct {
            println!(
                "    yours: {}  correct: {}",
                outcome.chosen.as_deref().unwrap_or("(none)"),
                outcome.correct
            );
        }
    }
}

fn outcome_mark(outcome: &QuestionOutcome) -> &'static str {
    if outcome.is_correct { "[ok]" } else { "[x] " }
}

pub fn leaderboard(entries: &[LeaderboardEntry]) {
    if entries.is_empty() {
        println!("No results yet.");
        return;
    }
    println!("{:>4}  {:<16} {:>7} {:>8} {:>9}  filters", "rank", "user", "score", "percent", "time");
    for entry in entries {
        println!(
            "{:>4}  {:<16} {:>7} {:>7.2}% {:>9}  {}",
            entry.rank,
            entry.user.as_ref().map_or("anonymous", UserId::as_str),
            format!("{}/{}", entry.score, entry.total),
            entry.percentage,
            format!("{:.1}s", entry.elapsed_secs),
            filter_label(&entry.filter),
        );
    }
}

pub fn history(user: &UserId, results: &[QuizResult]) {
    if results.is_empty() {
        println!("No results for {user}.");
        return;
    }
    for result in results {
        println!(
            "{}  {}/{} ({:.2}%)  {}  {}",
            result.completed_at().format("%Y-%m-%d %H:%M"),
            result.score(),
            result.total(),
            result.percentage(),
            result.outcome().as_str(),
            filter_label(result.filter()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::Difficulty;

    #[test]
    fn clock_label_formats_minutes_and_seconds() {
        assert_eq!(clock_label(TimeRemaining::Unlimited), "--:--");
        assert_eq!(
            clock_label(TimeRemaining::Limited(Duration::seconds(299))),
            "04:59"
        );
        assert_eq!(clock_label(TimeRemaining::Limited(Duration::zero())), "00:00");
    }

    #[test]
    fn filter_label_names_wildcards() {
        assert_eq!(
            filter_label(&QuestionFilter::any()),
            "Any subject / Any category / Any difficulty"
        );
        let filter = QuestionFilter::any()
            .with_subject("Anime")
            .with_difficulty(Difficulty::Medium);
        assert_eq!(filter_label(&filter), "Anime / Any category / Medium");
    }
}
