use crate::types::{Platform, Tone};

pub const SYSTEM_PROMPT: &str = "Ты профессиональный SMM-специалист, создающий вирусные посты для социальных сетей на русском языке.";

pub fn display_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Telegram => "Telegram",
        Platform::Instagram => "Instagram",
        Platform::Threads => "Threads",
        Platform::Youtube => "YouTube",
        Platform::Vk => "ВКонтакте",
    }
}

pub fn tone_description(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "профессиональный деловой стиль",
        Tone::Friendly => "дружеский разговорный стиль",
        Tone::Motivational => "мотивационный вдохновляющий стиль",
    }
}

/// Length and markup constraints the model should respect on each platform.
pub fn style_spec(platform: Platform) -> &'static str {
    match platform {
        Platform::Telegram => "Можешь использовать HTML разметку (<b>, <i>). Длина 150-300 символов. Лаконично и по делу.",
        Platform::Instagram => "Много эмодзи и хэштегов в конце. Длина 300-500 символов. Визуальный и эмоциональный контент.",
        Platform::Threads => "Краткий и дискуссионный формат. Длина 100-280 символов. Провоцируй обсуждение.",
        Platform::Youtube => "Описание для видео. Длина 200-400 символов. Интрига и призыв к действию (лайк, подписка).",
        Platform::Vk => "Пост для сообщества. Длина 200-500 символов. Живой тон, призыв к обсуждению в комментариях, 2-4 хэштега в конце.",
    }
}

/// Builds the user instruction. Unrecognized platform or tone names are
/// passed through verbatim and the style line is omitted.
pub fn build(topic: &str, platform: &str, tone: &str, resolved: (Option<Platform>, Option<Tone>)) -> String {
    let (platform_known, tone_known) = resolved;
    let platform_name = platform_known.map(display_name).unwrap_or(platform);
    let tone_text = tone_known.map(tone_description).unwrap_or(tone);

    let mut requirements = vec![format!("- Тон: {}", tone_text)];
    if let Some(p) = platform_known {
        requirements.push(format!("- {}", style_spec(p)));
    }
    requirements.push("- Текст должен быть на русском языке".to_string());
    requirements.push("- Будь креативным и уникальным".to_string());
    requirements.push("- Используй эмодзи где уместно".to_string());

    format!(
        "Создай пост для социальной сети {} на тему \"{}\".\n\nТребования:\n{}\n\nСоздай готовый к публикации пост:",
        platform_name,
        topic,
        requirements.join("\n"),
    )
}
