use tracing::debug;

use crate::gateway::DEFAULT_VIDEO_PROMPT;
use crate::runtime::types::{RuntimeError, Task};
use crate::settings::AppSettings;

/// Example prompt lines offered to users as `(label, line)` pairs.
pub const PROMPT_TEMPLATES: &[(&str, &str)] = &[
    (
        "Cat",
        "A fluffy orange cat sitting on a sunny windowsill | The cat yawns and stretches slowly",
    ),
    (
        "Waterfall",
        "A majestic waterfall in a lush green jungle | Camera pans slowly upward along the falling water",
    ),
    (
        "Cyberpunk",
        "A neon-lit cyberpunk street at night in the rain | Cars fly past as the neon signs flicker",
    ),
    (
        "Warrior",
        "An ancient warrior standing on a cliff at sunset | The warrior's cloak billows in the wind",
    ),
    (
        "Sci-fi",
        "A giant spaceship hovering over a futuristic city | The spaceship slowly descends as lights turn on",
    ),
];

/// Split `text` into one [`Task`] per non-blank line.
///
/// Each line is `<image prompt> [| <video prompt>]`. Fields are trimmed and
/// anything after a second `|` is ignored; a missing or blank video prompt
/// becomes [`DEFAULT_VIDEO_PROMPT`]. Ids are
/// 1-based, zero-padded ordinals and file stems use
/// [`AppSettings::base_name`].
pub fn parse_prompts(text: &str, settings: &AppSettings) -> Result<Vec<Task>, RuntimeError> {
    let base_name = settings.base_name();
    let tasks: Vec<Task> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(idx, line)| {
            let mut fields = line.split('|');
            let image = fields.next().map(str::trim).unwrap_or_default();
            let video = fields.next().map(str::trim).unwrap_or_default();

            let image_prompt = if image.is_empty() { line } else { image };
            let video_prompt = if video.is_empty() {
                DEFAULT_VIDEO_PROMPT
            } else {
                video
            };
            Task::new(idx + 1, base_name, image_prompt, video_prompt)
        })
        .collect();

    if tasks.is_empty() {
        return Err(RuntimeError::EmptyPrompt);
    }
    debug!(count = tasks.len(), base_name, "parsed prompt lines");
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::TaskStatus;
    use proptest::prelude::*;

    #[test]
    fn single_line_with_both_prompts() {
        let tasks = parse_prompts("cat on a roof | cat jumps off", &AppSettings::default()).unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.id, "001");
        assert_eq!(task.project_name, "duan_001");
        assert_eq!(task.image_prompt, "cat on a roof");
        assert_eq!(task.video_prompt, "cat jumps off");
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn missing_separator_uses_default_video_prompt() {
        let tasks = parse_prompts("x|y\n\n   \nz", &AppSettings::default()).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].image_prompt, "x");
        assert_eq!(tasks[0].video_prompt, "y");
        assert_eq!(tasks[1].id, "002");
        assert_eq!(tasks[1].image_prompt, "z");
        assert_eq!(tasks[1].video_prompt, DEFAULT_VIDEO_PROMPT);
    }

    #[test]
    fn blank_fields_fall_back() {
        let tasks = parse_prompts("| only motion\nstill life |  ", &AppSettings::default()).unwrap();
        assert_eq!(tasks[0].image_prompt, "| only motion");
        assert_eq!(tasks[0].video_prompt, "only motion");
        assert_eq!(tasks[1].video_prompt, DEFAULT_VIDEO_PROMPT);
    }

    #[test]
    fn extra_separators_are_ignored() {
        let tasks = parse_prompts("a | b | c", &AppSettings::default()).unwrap();
        assert_eq!(tasks[0].image_prompt, "a");
        assert_eq!(tasks[0].video_prompt, "b");
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(
            parse_prompts(" \n\t\n", &AppSettings::default()).unwrap_err(),
            RuntimeError::EmptyPrompt
        );
    }

    #[test]
    fn project_name_follows_prefix() {
        let settings = AppSettings {
            file_prefix: "  ".to_owned(),
            ..AppSettings::default()
        };
        let tasks = parse_prompts("a", &settings).unwrap();
        assert_eq!(tasks[0].project_name, "duan_001");

        let settings = AppSettings {
            file_prefix: "reel".to_owned(),
            ..AppSettings::default()
        };
        let tasks = parse_prompts("a\nb", &settings).unwrap();
        assert_eq!(tasks[1].project_name, "reel_002");
    }

    #[test]
    fn templates_parse_into_tasks() {
        let text: Vec<&str> = PROMPT_TEMPLATES.iter().map(|(_, line)| *line).collect();
        let tasks = parse_prompts(&text.join("\n"), &AppSettings::default()).unwrap();
        assert_eq!(tasks.len(), PROMPT_TEMPLATES.len());
        assert!(tasks.iter().all(|t| t.video_prompt != DEFAULT_VIDEO_PROMPT));
    }

    proptest! {
        #[test]
        fn one_task_per_non_blank_line(
            lines in prop::collection::vec("[ a-z|]{0,12}", 0..40)
        ) {
            let text = lines.join("\n");
            let expected: Vec<&String> = lines.iter().filter(|l| !l.trim().is_empty()).collect();

            match parse_prompts(&text, &AppSettings::default()) {
                Ok(tasks) => {
                    prop_assert_eq!(tasks.len(), expected.len());
                    for (idx, task) in tasks.iter().enumerate() {
                        prop_assert_eq!(&task.id, &format!("{:03}", idx + 1));
                        prop_assert!(!task.image_prompt.is_empty());
                        prop_assert!(!task.video_prompt.is_empty());
                    }
                    for pair in tasks.windows(2) {
                        prop_assert!(pair[0].id < pair[1].id);
                    }
                }
                Err(err) => {
                    prop_assert!(expected.is_empty());
                    prop_assert_eq!(err, RuntimeError::EmptyPrompt);
                }
            }
        }
    }
}
