//! Prompt construction for categorization and tagging.

use tabcatalog_shared::TabRecord;

const CATEGORIZE_INSTRUCTIONS: &str = "Organize these browser tabs into meaningful categories and \
subcategories based on their content. The number of categories and subcategories should be \
determined by the nature of the data, without any fixed limits. Provide a JSON response where \
each category (and optional subcategory) is a key, and the associated tab indices are the values. \
Be concise, logical, and thoughtful in forming categories.";

const INDEX_NOTE: &str = "Tab indices are the 0-based numbers shown before each tab. \
Respond with the JSON object only.";

/// Prompt asking for a `{category: [indices]}` object over `tabs`.
pub fn categorize_prompt(tabs: &[TabRecord]) -> String {
    let mut prompt = String::with_capacity(256 + tabs.len() * 96);
    prompt.push_str(CATEGORIZE_INSTRUCTIONS);
    prompt.push(' ');
    prompt.push_str(INDEX_NOTE);
    prompt.push_str("\n\n");

    for (i, tab) in tabs.iter().enumerate() {
        prompt.push_str(&format!("{i}. Title: {}, URL: {}\n", tab.title, tab.url));
    }
    prompt
}

/// Prompt asking for up to `max_tags` short tags as a JSON array of strings.
pub fn tag_prompt(tab: &TabRecord, category: &str, content: &str, max_tags: usize) -> String {
    format!(
        "Suggest at most {max_tags} short descriptive tags for this browser tab. \
Respond with a JSON array of strings only.\n\n\
Title: {title}\nURL: {url}\nCategory: {category}\n\nContent:\n{content}\n",
        title = tab.title,
        url = tab.url,
    )
}
