//! 提示词构建
//!
//! 系统指令、输出语法说明和各分块的内容消息

use crate::models::Chunk;
use crate::parsing::PageParser;

/// 系统指令
pub const SYSTEM_INSTRUCTION: &str = "Eres un asistente especializado en análisis de documentos. REGLAS:

1. Ubicación de ejercicios:
   - Usa SOLO la etiqueta [Página X] que precede al ejercicio
   - Lista los ejercicios bajo esa etiqueta exacta
   - Los ejercicios pertenecen a la página de su etiqueta anterior más cercana

2. Para cada búsqueda:
   - Busca en todas las páginas proporcionadas
   - Lista todos los resultados relevantes
   - Incluye siempre el número de página exacto";

/// 内容消息前的固定说明：输出语法 + 穷举要求
pub const EXTRACTION_PREAMBLE: &str = "Analiza EXHAUSTIVAMENTE todas las páginas siguientes. \
No omitas ningún ejercicio que cumpla el criterio indicado, aunque haya muchos.

Responde usando EXACTAMENTE este formato, un ejercicio por línea:
Ejercicio <número> (Página <página>): <descripción breve>

Usa como página el número de la etiqueta [Página X] más cercana que precede al ejercicio. \
Si ningún ejercicio cumple el criterio, responde: No se encontraron ejercicios.";

/// 页面内容前的页码标签
pub fn page_tag(page: u32) -> String {
    format!("[Página {}]", page)
}

/// 分块内容消息：说明 + 页码范围 + 每页（带页码标签，页码升序）
///
/// 页面内容已经以同页码的标记行开头时不再重复添加标签
pub fn chunk_message(chunk: &Chunk) -> String {
    let (first, last) = match (chunk.first_page(), chunk.last_page()) {
        (Some(first), Some(last)) => (first, last),
        _ => return EXTRACTION_PREAMBLE.to_string(),
    };

    let marker_parser = PageParser::default();
    let body = chunk
        .pages
        .iter()
        .map(|(page, content)| {
            let already_tagged = content
                .lines()
                .next()
                .and_then(|line| marker_parser.match_marker(line))
                .is_some_and(|marker| marker.page == *page);
            if already_tagged {
                content.clone()
            } else {
                format!("{}\n{}", page_tag(*page), content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\nContenido páginas {} a {}:\n\n{}",
        EXTRACTION_PREAMBLE, first, last, body
    )
}

/// 无页码结构时的一次性内容消息
pub fn whole_document_message(text: &str) -> String {
    format!("{}\n\nContenido del documento:\n\n{}", EXTRACTION_PREAMBLE, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_message_tags_pages_in_order() {
        let chunk = Chunk {
            index: 0,
            pages: vec![(3, "tres".to_string()), (4, "cuatro".to_string())],
        };

        let message = chunk_message(&chunk);

        assert!(message.starts_with(EXTRACTION_PREAMBLE));
        assert!(message.contains("Contenido páginas 3 a 4:"));
        assert!(message.ends_with("[Página 3]\ntres\n\n[Página 4]\ncuatro"));
    }

    #[test]
    fn test_chunk_message_does_not_duplicate_existing_marker() {
        let chunk = Chunk {
            index: 0,
            pages: vec![(5, "[Pagina 5]\ncinco".to_string())],
        };

        let message = chunk_message(&chunk);

        assert!(message.ends_with("\n\n[Pagina 5]\ncinco"));
        assert!(!message.contains("[Página 5]"));
    }

    #[test]
    fn test_whole_document_message() {
        let message = whole_document_message("texto libre");
        assert!(message.ends_with("Contenido del documento:\n\ntexto libre"));
    }
}
