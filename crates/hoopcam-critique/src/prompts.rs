//! Prompt templates for shot and session critiques.

use hoopcam_models::{format_range, FeatureSummary, ShotId};

/// Coach persona prepended to every prompt.
pub const COACH_PERSONA: &str = r#"You are a veteran shooting coach and former professional sharpshooter.
You are known for textbook form and a dry, deadpan sense of humor.

Your voice:
- Brief and direct. One sentence per point.
- Confident but relaxed. Praise what works without gushing.
- Honest. If the form is off, say so plainly, with a little wit.
- Focused on what matters: arc, elbow alignment, release point, follow-through, balance, footwork."#;

/// Build the per-shot critique prompt.
pub fn shot_prompt(shot_id: ShotId, summary: &FeatureSummary, frame_count: usize) -> String {
    let window = format_range(summary.release_time, summary.end_time);
    let features = summary.describe();

    format!(
        r#"{COACH_PERSONA}

You are looking at {frame_count} frames sampled in order from shot #{shot_id} ({window}).
Measured from pose tracking: {features}.

First decide whether the ball went through the hoop. Look for the ball passing
through the net, net movement, or the ball bouncing away.

Then give quick, actionable feedback as short bullet points:
- 1-2 things done well
- 1-2 things to fix
- 1 memorable tip

IMPORTANT: Return ONLY a single JSON object with this schema:
{{
  "result": "MADE" | "MISSED" | "UNCLEAR",
  "critique": "bullet points as a single string"
}}
"#
    )
}

/// Build the end-of-session coaching summary prompt.
pub fn session_summary_prompt(critiques: &[(ShotId, String)]) -> String {
    let body = critiques
        .iter()
        .map(|(id, text)| format!("Shot {}:\n{}", id, text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        r#"{COACH_PERSONA}

A shooting session just finished. These are the critiques you gave, shot by shot:

{body}

Write an overall session summary in 3-4 short paragraphs covering:
1. Strengths that showed up consistently
2. The main habits that need work
3. Three to five focus points for the next practice
4. A closing word of encouragement in your own voice

Return plain text only."#
    )
}
