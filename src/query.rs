//! Question answering over the indexed chunks.
//!
//! Embeds the question, retrieves the top-k nearest chunks, concatenates
//! their text in the order the backend returned them, and hands the lot
//! to the answer provider. Nothing is cached: every question re-embeds
//! and re-retrieves.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use crate::answer::{self, Answerer};
use crate::config::Config;
use crate::embedding::{self, embed_query, Embedder};
use crate::index::{self, VectorIndex};

pub struct QueryEngine<'a> {
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
    answerer: &'a dyn Answerer,
    top_k: usize,
}

impl<'a> QueryEngine<'a> {
    pub fn new(
        index: &'a dyn VectorIndex,
        embedder: &'a dyn Embedder,
        answerer: &'a dyn Answerer,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            answerer,
            top_k,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<String> {
        let vector = embed_query(self.embedder, question)
            .await
            .context("embedding the question")?;

        let hits = self
            .index
            .search(&vector, self.top_k)
            .await
            .context("searching the index")?;

        let context = hits
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        self.answerer
            .answer(&context, question)
            .await
            .context("generating the answer")
    }
}

/// A line that ends the interactive loop.
pub fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Answer one question, or run the interactive loop when none is given.
///
/// The loop reads a line at a time; "exit" (any casing) terminates, blank
/// lines are ignored, and a failed question is displayed without ending
/// the session.
pub async fn run_ask(config: &Config, question: Option<String>) -> Result<()> {
    let gateway = index::create_index(&config.index)?;
    let embedder = embedding::create_embedder(&config.embedding)?;
    let answerer = answer::create_answerer(&config.answer)?;

    let engine = QueryEngine::new(
        gateway.as_ref(),
        embedder.as_ref(),
        answerer.as_ref(),
        config.retrieval.top_k,
    );

    if let Some(question) = question {
        let answer = engine.answer(&question).await?;
        println!("{}", answer);
        return Ok(());
    }

    let interactive = atty::is(atty::Stream::Stdin);
    if interactive {
        println!("Ask a question (type 'exit' to quit):");
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        if is_exit(&line) {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match engine.answer(question).await {
            Ok(answer) => println!("\n{}\n", answer),
            Err(e) => eprintln!("error: {:#}", e),
        }
    }

    Ok(())
}
