//! Built-in prompt definitions.
//!
//! The English set is the default; the `.pl` set serves the Polish document
//! profile. Both can be overridden per workspace (see [`crate::loader`]).

use crate::types::PromptDefinition;
use charter_core::{AppError, AppResult};

pub const CONTEXTUALIZE: &str = "rag.contextualize";
pub const ANSWER: &str = "rag.answer";

const CONTEXTUALIZE_EN: &str = r#"
id: rag.contextualize
title: Standalone question
apiVersion: "1.0"
createdBy: charter
description: Rewrites a follow-up question so it can be understood without the chat history.
variables: []
template: >-
  Given the chat history and the latest user question, which may refer to
  information in the chat history, formulate a standalone question that takes
  the context of the chat history into account. Do NOT answer the question;
  only reformulate it if needed, otherwise return it unchanged.
"#;

const ANSWER_EN: &str = r#"
id: rag.answer
title: Grounded answer
apiVersion: "1.0"
createdBy: charter
description: Answers strictly from the retrieved passages, or replies with the sentinel.
variables: [context, sentinel]
template: |-
  You are an assistant answering questions about the Constitution. Answer as honestly and as accurately as you can, using only the information contained in the provided context. If you do not find the answer in the context, reply exactly: '{{sentinel}}'

  {{context}}
"#;

const CONTEXTUALIZE_PL: &str = r#"
id: rag.contextualize.pl
title: Samodzielne pytanie
apiVersion: "1.0"
createdBy: charter
variables: []
template: >-
  Biorąc pod uwagę historię czatu i ostatnie pytanie użytkownika, które może
  odnosić się do informacji z historii czatu, sformułuj samodzielne pytanie,
  które będzie uwzględniało kontekst historii czatu. NIE odpowiadaj na pytanie,
  tylko przeformułuj je w razie potrzeby, a w przeciwnym razie zwróć je bez zmian.
"#;

const ANSWER_PL: &str = r#"
id: rag.answer.pl
title: Odpowiedź na podstawie kontekstu
apiVersion: "1.0"
createdBy: charter
variables: [context, sentinel]
template: |-
  Jesteś asystentem, który odpowiada na pytania dotyczące Konstytucji Rzeczypospolitej Polskiej. Odpowiedz najuczciwiej i najdokładniej jak tylko umiesz, używając tylko i wyłącznie informacji zawartych w przekazanym kontekście. Jeżeli nie znajdziesz odpowiedzi na pytanie w kontekście, odpowiedz: '{{sentinel}}'

  {{context}}
"#;

const BUILTINS: [&str; 4] = [CONTEXTUALIZE_EN, ANSWER_EN, CONTEXTUALIZE_PL, ANSWER_PL];

/// IDs of every built-in prompt.
pub fn builtin_prompt_ids() -> Vec<&'static str> {
    vec![
        CONTEXTUALIZE,
        ANSWER,
        "rag.contextualize.pl",
        "rag.answer.pl",
    ]
}

/// Look up a built-in prompt by ID.
pub fn builtin_prompt(prompt_id: &str) -> AppResult<Option<PromptDefinition>> {
    for source in BUILTINS {
        let definition: PromptDefinition = serde_yaml::from_str(source)
            .map_err(|e| AppError::Prompt(format!("Invalid built-in prompt: {}", e)))?;
        if definition.id == prompt_id {
            return Ok(Some(definition));
        }
    }
    Ok(None)
}
