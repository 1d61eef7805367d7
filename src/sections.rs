//! Projection of ingested articles into analysis sections.

use crate::models::{Article, Section, SectionMetadata};

/// Map each article to one [`Section`], preserving order.
///
/// Pure and total: no filtering, no deduplication. Optional article fields are
/// normalized so the metadata is always fully populated (`pubDate` is `""` when
/// the origin gave none).
pub fn to_sections(articles: &[Article]) -> Vec<Section> {
    articles.iter().map(to_section).collect()
}

fn to_section(article: &Article) -> Section {
    Section {
        id: article.id.clone(),
        text: article.text.clone(),
        index: article.index,
        metadata: SectionMetadata {
            title: article.title.clone(),
            source: article.source.clone(),
            link: article.link.clone(),
            pub_date: article.pub_date.clone().unwrap_or_default(),
            description: article.description.clone(),
            date: article.date,
            index: article.index,
        },
    }
}
