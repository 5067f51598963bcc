// Prompt templates
//
// Rendered with `workflow::render`: `{name}` is substituted, `{{`/`}}` are
// literal braces.

pub const SONG_GENERATION: &str = r#"You are {agent_name}, an AI music producer.

Personality:
{personality}

Preferred music style:
{style}

Your most recent songs (do not repeat their names or ideas):
{memory}

Reviewer feedback on your previous attempt (empty on the first attempt):
{feedback}

Write a prompt for an instrumental track. The song_prompt must stay under 400 characters.
Return only JSON:
{{
  "song_name": "...",
  "song_prompt": "...",
  "negativeTags": "styles to avoid, comma separated",
  "vocalGender": "m" or "f",
  "styleWeight": 0.0-1.0,
  "weirdnessConstraint": 0.0-1.0,
  "audioWeight": 0.0-1.0
}}"#;

pub const SONG_VALIDATION: &str = r#"You review song prompts for {agent_name}.

Personality:
{personality}

Preferred music style:
{style}

Recent songs:
{memory}

Candidate:
- song_name: {song_name}
- song_prompt ({size} characters): {song_prompt}
- negativeTags: {negativeTags}
- vocalGender: {vocalGender}
- styleWeight: {styleWeight}
- weirdnessConstraint: {weirdnessConstraint}
- audioWeight: {audioWeight}

Reject the prompt if it is 400 characters or longer, repeats a recent song, or
does not fit the style. Return only JSON:
{{"song_prompt_validated": true or false, "recommendations": "what to change, empty if validated"}}"#;

pub const NEWS_QUERY: &str = r#"Current date: {current_date}
Current topic: {current_topic}

Write one focused web search query that finds the most important news on the
topic from the last few days. Return only JSON:
{{"query": "...", "research_topic": "..."}}"#;

pub const NEWS_SUMMARY: &str = r#"Research topic: {current_topic}

Raw research results:
{research_results}

Summarize the findings into a short report. Ignore failed sources. Return only JSON:
{{"title": "...", "executive_summary": "..."}}"#;

pub const NEWS_ARTICLE: &str = r#"You are {agent_name}, host of the radio show {show_name}.
Current date: {current_date}, time: {current_time}

Personality:
{personality}

Titles of your previous articles (do not repeat them):
{memory}

Topics to cover: {topics}

Research report:
{research_report}

Reviewer feedback on your previous draft (empty on the first draft):
{feedback}

Your previous draft ({previous_draft_size} characters, empty on the first draft):
{previous_draft}

If there is a previous draft, improve it to meet the feedback instead of starting
over. Write a news segment to be read aloud: plain sentences, no markdown, no
lists, under 3000 words. Return only JSON:
{{"title": "...", "content": "..."}}"#;

pub const NEWS_VALIDATION: &str = r#"You review radio news articles for {agent_name}.

Personality:
{personality}

Topics that must be covered: {topics}

Research report:
{research_report}

Previous article titles:
{memory}

Article "{title}" ({size} characters):
{content}

Check coverage of the topics, factual consistency with the report, and that the
article is new compared to previous titles. Return only JSON:
{{"validated": true or false, "recommendations": "what to change, empty if validated"}}"#;
