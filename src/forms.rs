use serde::Deserialize;
use std::collections::HashMap;
use tracing::{error, info, instrument, Level};

use crate::error::{Error, Result};
use crate::record::{str_field, Record};

pub const RELAY_ADDRESS: &str = "sintraclassicos14@gmail.com";

const SENT_STATUS: &str = "Mensagem enviada com sucesso.";
const FAILED_STATUS: &str = "Erro ao enviar. Tente novamente.";
const FAILED_DIALOG: &str = "Ocorreu um erro ao enviar a sua mensagem. Por favor, \
tente novamente mais tarde ou contacte-nos diretamente.";

/// Capability for showing the feedback dialog, injected instead of looked up
/// through a shared namespace.
pub trait DialogPresenter {
    /// `offer_form` adds the "fill in the form" affordance to the dialog.
    fn show(&self, message: &str, offer_form: bool);
}

/// Confirmation texts for the feedback dialogs. Defaults ship with the page;
/// the loaded site-config section may override them one-way.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    pub participar_evento: String,
    pub requisitar_produto: String,
    pub feedback_comunidade: String,
    pub formulario_contacto: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            participar_evento: "Agradecemos pelo seu interesse em \"{{evento}}\". Para proceder \
                com a sua inscrição, preencha o formulário abaixo"
                .to_string(),
            requisitar_produto: "Este produto só está disponível para ser requisitado e adquirido \
                presencialmente, dirija-se a um dos nossos colaboradores no decorrer do evento \
                para o requisitar"
                .to_string(),
            feedback_comunidade: "Obrigado pela sua sugestão! Vamos analisar o seu feedback para \
                melhorar a experiência de todos os que participam no SintraClássicos."
                .to_string(),
            formulario_contacto: "Os detalhes do teu evento/parceria foram enviados. A equipa \
                Sintra Clássicos entrará em contacto para alinhar os próximos passos."
                .to_string(),
        }
    }
}

impl MessageTemplates {
    /// One-way push from the loaded site-config record. Absent fields keep
    /// their current text.
    pub fn apply_config(&mut self, config: &Record) {
        let overrides = [
            ("modalParticiparEvento", &mut self.participar_evento),
            ("modalRequisitarProduto", &mut self.requisitar_produto),
            ("modalFeedbackComunidade", &mut self.feedback_comunidade),
            ("modalFormularioContacto", &mut self.formulario_contacto),
        ];

        for (field, slot) in overrides {
            if let Some(text) = str_field(config, field) {
                *slot = text.to_string();
            }
        }
    }

    pub fn participar_message(&self, event_name: &str) -> String {
        let name = match event_name.is_empty() {
            true => "neste evento",
            false => event_name,
        };
        self.participar_evento.replace("{{evento}}", name)
    }
}

#[derive(Deserialize, Debug)]
struct RelayResponse {
    success: serde_json::Value,
}

impl RelayResponse {
    // The relay answers success either as a boolean or as the string "true".
    fn succeeded(&self) -> bool {
        match &self.success {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => s == "true",
            _ => false,
        }
    }
}

/// Client for the third-party form-relay endpoint.
#[derive(Debug)]
pub struct FormRelay {
    client: reqwest::Client,
    endpoint: String,
}

impl FormRelay {
    pub fn new(address: &str) -> Result<Self> {
        let client = reqwest::ClientBuilder::new().build()?;
        Ok(Self {
            client,
            endpoint: format!("https://formsubmit.co/ajax/{address}"),
        })
    }

    #[instrument(skip_all, err(Debug, level = Level::DEBUG))]
    pub async fn submit(&self, fields: &HashMap<String, String>) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(fields)
            .send()
            .await?
            .error_for_status()?
            .json::<RelayResponse>()
            .await?;

        match response.succeeded() {
            true => Ok(()),
            false => Err(Error::FormRejected),
        }
    }
}

/// Outcome surfaced next to the form after a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub sent: bool,
    pub inline_status: &'static str,
}

/// Submits one form and drives the user-visible feedback: confirmation dialog
/// and cleared form on success, inline error plus failure dialog otherwise.
/// The user may retry manually; there is no automatic retry.
pub async fn submit_with_feedback<P: DialogPresenter>(
    relay: &FormRelay,
    presenter: &P,
    confirmation: &str,
    fields: &HashMap<String, String>,
) -> SubmitOutcome {
    match relay.submit(fields).await {
        Ok(()) => {
            info!("form submission accepted");
            presenter.show(confirmation, false);
            SubmitOutcome {
                sent: true,
                inline_status: SENT_STATUS,
            }
        }
        Err(error) => {
            error!(%error, "form submission failed");
            presenter.show(FAILED_DIALOG, false);
            SubmitOutcome {
                sent: false,
                inline_status: FAILED_STATUS,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_participar_template_substitution() {
        let templates = MessageTemplates::default();
        let message = templates.participar_message("Sintra Clássicos Festival");
        assert!(message.contains("\"Sintra Clássicos Festival\""));
        assert!(!message.contains("{{evento}}"));
    }

    #[test]
    fn test_participar_falls_back_to_generic_name() {
        let templates = MessageTemplates::default();
        assert!(templates.participar_message("").contains("neste evento"));
    }

    #[test]
    fn test_config_overrides_are_partial() {
        let mut templates = MessageTemplates::default();
        let config = json!({ "modalFeedbackComunidade": "Obrigado!" })
            .as_object()
            .unwrap()
            .clone();
        let untouched = templates.formulario_contacto.clone();

        templates.apply_config(&config);

        assert_eq!(templates.feedback_comunidade, "Obrigado!");
        assert_eq!(templates.formulario_contacto, untouched);
    }

    #[test]
    fn test_relay_response_shapes() {
        let boolean: RelayResponse = serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(boolean.succeeded());

        let string: RelayResponse =
            serde_json::from_value(json!({ "success": "true" })).unwrap();
        assert!(string.succeeded());

        let failed: RelayResponse =
            serde_json::from_value(json!({ "success": false })).unwrap();
        assert!(!failed.succeeded());
    }
}
