use crate::models::{Channel, Contact};
use crate::sender::OutboundMessage;

const CLAIM_URL: &str = "https://geobooker.com.mx/registro";

// Builds the outbound message for a contact on the given channel.
// Returns None when the contact has no usable address for it.
pub fn render_message(channel: Channel, contact: &Contact) -> Option<OutboundMessage> {
    let to = contact.channel_address(channel)?.to_string();

    let message = match channel {
        Channel::Email => OutboundMessage {
            to,
            subject: email_subject(contact),
            body: email_body(contact),
        },
        Channel::Whatsapp => OutboundMessage {
            to,
            subject: String::new(),
            body: whatsapp_body(contact),
        },
    };

    Some(message)
}

pub fn email_subject(contact: &Contact) -> String {
    if contact.tier.is_premium() {
        format!(
            "{}, tu negocio merece un lugar destacado en Geobooker",
            contact.company_name
        )
    } else {
        format!("Haz que más clientes encuentren a {}", contact.company_name)
    }
}

pub fn email_body(contact: &Contact) -> String {
    let greeting = format!("<p>Hola {},</p>", contact.display_name());

    let pitch = if contact.tier.is_premium() {
        format!(
            "<p>En Geobooker ya reservamos un lugar destacado para <strong>{}</strong>. \
             Miles de personas usan nuestro mapa cada semana para encontrar negocios como el tuyo, \
             y los perfiles destacados reciben hasta tres veces más visitas.</p>",
            contact.company_name
        )
    } else {
        format!(
            "<p>¿Sabías que tus clientes ya buscan negocios como <strong>{}</strong> en Geobooker? \
             Registrar tu negocio es gratis y toma menos de cinco minutos.</p>",
            contact.company_name
        )
    };

    format!(
        "{greeting}\
         {pitch}\
         <p><a href=\"{url}\">Reclama tu perfil aquí</a> y empieza a recibir más clientes.</p>\
         <p>Saludos,<br>El equipo de Geobooker</p>",
        greeting = greeting,
        pitch = pitch,
        url = CLAIM_URL,
    )
}

pub fn whatsapp_body(contact: &Contact) -> String {
    if contact.tier.is_premium() {
        format!(
            "¡Hola {name}! 👋 Somos Geobooker. Reservamos un lugar destacado para {company} \
             en nuestro mapa de negocios. Reclámalo gratis aquí: {url}",
            name = contact.display_name(),
            company = contact.company_name,
            url = CLAIM_URL,
        )
    } else {
        format!(
            "¡Hola {name}! 👋 Somos Geobooker, el mapa donde tus clientes te buscan. \
             Registra {company} gratis en {url} y haz que te encuentren.",
            name = contact.display_name(),
            company = contact.company_name,
            url = CLAIM_URL,
        )
    }
}
