//! Built-in starter knowledge base.

use crate::document::{Document, SOURCE_KEY};

/// `source` metadata carried by every seed document.
pub const SEED_SOURCE: &str = "mental_health_therapy";

/// Metadata key naming the topic of a seed document.
pub const TOPIC_KEY: &str = "topic";

const SEED: [(&str, &str); 5] = [
    (
        "CBT",
        "Cognitive Behavioral Therapy (CBT) is a form of psychotherapy that focuses on identifying and changing negative thought patterns and behaviors. It's effective for treating depression, anxiety, and other mental health conditions.",
    ),
    (
        "mindfulness",
        "Mindfulness meditation involves focusing on the present moment without judgment. Regular practice can reduce stress, anxiety, and improve overall mental well-being.",
    ),
    (
        "breathing_exercises",
        "Deep breathing exercises can help calm the nervous system. Try inhaling for 4 counts, holding for 4, and exhaling for 6 counts to activate the parasympathetic nervous system.",
    ),
    (
        "exercise",
        "Regular exercise releases endorphins, natural mood lifters. Even 30 minutes of moderate exercise can significantly improve mood and reduce symptoms of depression and anxiety.",
    ),
    (
        "sleep_hygiene",
        "Maintaining a consistent sleep schedule is crucial for mental health. Aim for 7-9 hours of quality sleep per night to support emotional regulation and cognitive function.",
    ),
];

/// The five seed documents, each tagged with `source` and `topic`.
pub fn seed_documents() -> Vec<Document> {
    SEED.iter()
        .map(|(topic, text)| {
            Document::new(*text).with_metadata(SOURCE_KEY, SEED_SOURCE).with_metadata(TOPIC_KEY, *topic)
        })
        .collect()
}
