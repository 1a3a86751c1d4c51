use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StyleProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub core: &'static str,
    pub materials: &'static str,
    pub colors: &'static str,
    pub furniture: &'static str,
    pub lighting: &'static str,
    pub details: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoomProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub space: &'static str,
    pub furniture: &'static str,
    pub features: &'static str,
}

/// Catalog entry for the replaceable-object pickers.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ObjectKind {
    pub id: &'static str,
    pub name: &'static str,
    pub emoji: &'static str,
}

static STYLES: [StyleProfile; 9] = [
    StyleProfile {
        id: "modern_minimalist",
        name: "Modern Minimalist",
        core: "modern minimalist interior",
        materials: "glass, polished concrete, smooth surfaces",
        colors: "white, gray, beige, black accents",
        furniture: "clean-lined furniture, low-profile sofa, geometric shapes",
        lighting: "recessed LED lighting, natural daylight, soft ambient glow",
        details: "hidden storage, potted plants, minimal decor",
    },
    StyleProfile {
        id: "scandinavian",
        name: "Scandinavian",
        core: "scandinavian nordic interior",
        materials: "light oak wood, wool textiles, linen, rattan",
        colors: "white walls, light wood, soft pastels, muted blue",
        furniture: "danish modern furniture, organic curves, functional design",
        lighting: "large windows, bright diffused daylight, warm pendant lights",
        details: "sheepskin throws, candles, indoor plants, woven baskets",
    },
    StyleProfile {
        id: "chinese_modern",
        name: "Modern Chinese",
        core: "modern chinese oriental interior",
        materials: "dark walnut, bamboo, silk fabric, lacquered wood",
        colors: "deep red, black, gold accents, jade green, ivory",
        furniture: "ming-style chairs, low tea table, screen dividers, symmetrical",
        lighting: "paper lantern glow, warm ambient light, accent spotlights",
        details: "calligraphy art, porcelain vases, bonsai, traditional patterns",
    },
    StyleProfile {
        id: "light_luxury",
        name: "Light Luxury",
        core: "light luxury elegant interior",
        materials: "marble, velvet, brass, leather, crystal",
        colors: "champagne gold, dusty pink, navy blue, cream white",
        furniture: "tufted sofa, designer pieces, sculptural furniture",
        lighting: "crystal chandelier, golden wall sconces, dramatic highlights",
        details: "metallic accents, art deco elements, fresh flowers",
    },
    StyleProfile {
        id: "japanese_wood",
        name: "Japanese Wood",
        core: "japanese wabi-sabi interior",
        materials: "hinoki wood, cedar, tatami, shoji paper, stone",
        colors: "warm wood tones, off-white, beige, earth tones",
        furniture: "low furniture, floor seating, built-in storage, futon",
        lighting: "soft diffused natural light, paper lanterns, warm indirect glow",
        details: "sliding shoji doors, ikebana arrangement, ceramic pottery",
    },
    StyleProfile {
        id: "industrial",
        name: "Industrial",
        core: "industrial loft interior",
        materials: "exposed brick, raw concrete, metal pipes, reclaimed wood",
        colors: "gray, rust orange, black, dark brown, metallic",
        furniture: "metal frame furniture, leather sofa, industrial shelving",
        lighting: "edison bulbs, exposed track lighting, hard directional light",
        details: "exposed ductwork, vintage signage, large factory windows",
    },
    StyleProfile {
        id: "american_country",
        name: "American Country",
        core: "american farmhouse country interior",
        materials: "distressed wood, cotton fabric, painted furniture, ceramic",
        colors: "warm white, sage green, dusty blue, butter yellow",
        furniture: "overstuffed sofa, farmhouse table, windsor chairs",
        lighting: "warm golden sunlight, rustic lanterns, soft lamplight",
        details: "floral patterns, gingham, mason jars, quilts",
    },
    StyleProfile {
        id: "french_romantic",
        name: "French Romantic",
        core: "french provincial romantic interior",
        materials: "ornate moldings, gilded frames, toile fabric, marble",
        colors: "blush pink, lavender, cream white, powder blue, gold",
        furniture: "louis xvi chairs, tufted upholstery, antique mirrors",
        lighting: "crystal chandelier, soft romantic glow, candlelight ambiance",
        details: "fresh roses, ornate frames, lace curtains",
    },
    StyleProfile {
        id: "mediterranean",
        name: "Mediterranean",
        core: "mediterranean coastal interior",
        materials: "terracotta tiles, wrought iron, stucco walls, ceramic",
        colors: "ocean blue, turquoise, white, terracotta, olive green",
        furniture: "rustic wood furniture, arched details, mosaic patterns",
        lighting: "bright mediterranean sunlight, warm golden hour glow",
        details: "potted herbs, blue pottery, arched doorways",
    },
];

static ROOM_TYPES: [RoomProfile; 10] = [
    RoomProfile {
        id: "living_room",
        name: "Living Room",
        space: "spacious living room",
        furniture: "sofa set, coffee table, TV console, armchairs",
        features: "area rug, window treatments, focal wall",
    },
    RoomProfile {
        id: "bedroom",
        name: "Bedroom",
        space: "cozy bedroom",
        furniture: "bed with headboard, nightstands, wardrobe",
        features: "soft bedding, window curtains, accent wall",
    },
    RoomProfile {
        id: "master_bedroom",
        name: "Master Bedroom",
        space: "luxurious master bedroom suite",
        furniture: "king bed, nightstands, seating area, vanity",
        features: "walk-in closet, chandelier, large windows",
    },
    RoomProfile {
        id: "kitchen",
        name: "Kitchen",
        space: "modern kitchen",
        furniture: "cabinetry, kitchen island, bar stools",
        features: "countertops, backsplash, range hood, pendant lights",
    },
    RoomProfile {
        id: "dining_room",
        name: "Dining Room",
        space: "elegant dining room",
        furniture: "dining table, upholstered chairs, sideboard",
        features: "chandelier, centerpiece, wall art",
    },
    RoomProfile {
        id: "bathroom",
        name: "Bathroom",
        space: "modern spa bathroom",
        furniture: "vanity cabinet, mirror, storage",
        features: "rainfall shower, elegant fixtures, tile work",
    },
    RoomProfile {
        id: "study",
        name: "Study",
        space: "home office study room",
        furniture: "executive desk, ergonomic chair, bookshelves",
        features: "task lighting, built-in shelving, window view",
    },
    RoomProfile {
        id: "kids_room",
        name: "Kids Room",
        space: "playful children bedroom",
        furniture: "child bed, toy storage, desk area",
        features: "colorful accents, creative wall art, soft rugs",
    },
    RoomProfile {
        id: "balcony",
        name: "Balcony",
        space: "outdoor balcony terrace",
        furniture: "outdoor seating, planters, small table",
        features: "potted plants, string lights, outdoor rug",
    },
    RoomProfile {
        id: "entrance",
        name: "Entrance",
        space: "welcoming entryway foyer",
        furniture: "console table, shoe cabinet, coat hooks",
        features: "mirror, pendant light, decorative accents",
    },
];

pub const QUALITY_LINES: [&str; 4] = [
    "photographic realism, hyper-realistic textures, true-to-life materials",
    "shot on Canon EOS R5, 16mm wide angle lens, f/8 aperture, ISO 100",
    "professional architectural photography, perfect composition, eye-level view",
    "octane render, ray traced global illumination, physically based rendering",
];

static FURNITURE_KINDS: [ObjectKind; 8] = [
    ObjectKind { id: "sofa", name: "Sofa", emoji: "🛋️" },
    ObjectKind { id: "chair", name: "Chair", emoji: "🪑" },
    ObjectKind { id: "table", name: "Table", emoji: "🪵" },
    ObjectKind { id: "bed", name: "Bed", emoji: "🛏️" },
    ObjectKind { id: "desk", name: "Desk", emoji: "📝" },
    ObjectKind { id: "cabinet", name: "Cabinet", emoji: "🗄️" },
    ObjectKind { id: "lamp", name: "Lamp", emoji: "💡" },
    ObjectKind { id: "bookshelf", name: "Bookshelf", emoji: "📚" },
];

static DECORATION_KINDS: [ObjectKind; 8] = [
    ObjectKind { id: "painting", name: "Painting", emoji: "🖼️" },
    ObjectKind { id: "plant", name: "Plant", emoji: "🌿" },
    ObjectKind { id: "vase", name: "Vase", emoji: "🏺" },
    ObjectKind { id: "curtain", name: "Curtain", emoji: "🪟" },
    ObjectKind { id: "rug", name: "Rug", emoji: "🧶" },
    ObjectKind { id: "clock", name: "Clock", emoji: "🕐" },
    ObjectKind { id: "mirror", name: "Mirror", emoji: "🪞" },
    ObjectKind { id: "sculpture", name: "Sculpture", emoji: "🗿" },
];

pub fn styles() -> &'static [StyleProfile] {
    &STYLES
}

pub fn room_types() -> &'static [RoomProfile] {
    &ROOM_TYPES
}

pub fn style(id: &str) -> Option<&'static StyleProfile> {
    STYLES.iter().find(|s| s.id == id.trim())
}

pub fn room_type(id: &str) -> Option<&'static RoomProfile> {
    ROOM_TYPES.iter().find(|r| r.id == id.trim())
}

pub fn furniture_kinds() -> &'static [ObjectKind] {
    &FURNITURE_KINDS
}

pub fn decoration_kinds() -> &'static [ObjectKind] {
    &DECORATION_KINDS
}

/// Positive and negative prompt for an inpainting call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InpaintPrompt {
    pub prompt: String,
    pub negative_prompt: String,
}

pub const DEFAULT_INPAINT_NEGATIVE: &str = "blurry, low quality, distorted, deformed";

fn furniture_style_phrase(style: &str) -> &'static str {
    match style.trim() {
        "scandinavian" => "scandinavian style, natural wood, light colors",
        "chinese" | "chinese_modern" => "chinese traditional style, carved wood, oriental",
        "light_luxury" => "luxury style, premium materials, sophisticated",
        "industrial" => "industrial style, metal and wood, rustic",
        _ => "modern minimalist style, clean lines, elegant",
    }
}

/// Prompt for swapping a piece of furniture; unknown styles fall back to modern.
pub fn furniture_prompt(furniture_type: &str, style: &str) -> InpaintPrompt {
    InpaintPrompt {
        prompt: format!(
            "high quality {}, {}, interior design, professional photo, 8k",
            furniture_type.trim(),
            furniture_style_phrase(style)
        ),
        negative_prompt: "blurry, low quality, distorted, cartoon, anime, sketch".to_string(),
    }
}

pub fn decoration_prompt(decoration_type: &str, description: Option<&str>) -> InpaintPrompt {
    let decoration_type = decoration_type.trim();
    let base = match decoration_type {
        "painting" => "beautiful framed artwork, oil painting, gallery quality".to_string(),
        "plant" => "lush green indoor plant, potted plant, natural".to_string(),
        "vase" => "elegant decorative vase, ceramic, artistic".to_string(),
        "curtain" => "luxurious curtains, draped fabric, elegant".to_string(),
        "rug" => "beautiful area rug, patterned carpet, cozy".to_string(),
        "lamp" => "designer lamp, ambient lighting, stylish".to_string(),
        other => format!("beautiful {}", other),
    };

    let prompt = match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => format!("{}, {}, interior design, high quality photo", base, description),
        None => format!("{}, interior design, high quality photo", base),
    };

    InpaintPrompt {
        prompt,
        negative_prompt: "blurry, low quality, distorted, out of place".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sizes_and_ids_are_unique() {
        assert_eq!(styles().len(), 9);
        assert_eq!(room_types().len(), 10);
        let mut ids: Vec<&str> = styles().iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(style("industrial").map(|s| s.core), Some("industrial loft interior"));
        assert!(style("baroque").is_none());
        assert_eq!(room_type(" study ").map(|r| r.name), Some("Study"));
    }

    #[test]
    fn test_furniture_prompt() {
        let p = furniture_prompt("sofa", "scandinavian");
        assert_eq!(
            p.prompt,
            "high quality sofa, scandinavian style, natural wood, light colors, interior design, professional photo, 8k"
        );
        assert!(furniture_prompt("chair", "unknown")
            .prompt
            .contains("modern minimalist style"));
    }

    #[test]
    fn test_decoration_prompt() {
        let p = decoration_prompt("plant", Some("tall fiddle leaf fig"));
        assert_eq!(
            p.prompt,
            "lush green indoor plant, potted plant, natural, tall fiddle leaf fig, interior design, high quality photo"
        );
        assert_eq!(
            decoration_prompt("clock", None).prompt,
            "beautiful clock, interior design, high quality photo"
        );
    }
}
