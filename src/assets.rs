//! Image URLs for feed entities. Pure string templating.

use crate::models::{ChampionSummary, GameMap, Item, Passive, Rune, RuneTree, Skin, Spell, Version};

pub const DEFAULT_CDN_URL: &str = "https://ddragon.leagueoflegends.com";

/// Shown when a map has no icon of its own.
pub const FALLBACK_MAP_ID: &str = "11";

/// One picture in a map's detail gallery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapImage {
    pub label: &'static str,
    pub url: String,
}

fn loading_art_name(m: &GameMap) -> Option<&'static str> {
    match m.map_id.as_str() {
        "11" => Some("SummonersRift"),
        "12" => Some("HowlingAbyss"),
        _ => None,
    }
}

/// Number of pictures [`AssetUrls::map_gallery`] yields for `m`.
pub fn map_gallery_len(m: &GameMap) -> usize {
    if loading_art_name(m).is_some() {
        3
    } else {
        2
    }
}

#[derive(Clone, Debug)]
pub struct AssetUrls {
    base: String,
}

impl Default for AssetUrls {
    fn default() -> Self {
        Self::new(DEFAULT_CDN_URL)
    }
}

impl AssetUrls {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn versioned(&self, v: &Version, group: &str, file: &str) -> String {
        format!("{}/cdn/{}/img/{}/{}", self.base, v, group, urlencoding::encode(file))
    }

    pub fn champion_icon(&self, v: &Version, c: &ChampionSummary) -> String {
        self.versioned(v, "champion", &c.image.full)
    }

    pub fn passive_icon(&self, v: &Version, p: &Passive) -> String {
        self.versioned(v, "passive", &p.image.full)
    }

    pub fn spell_icon(&self, v: &Version, s: &Spell) -> String {
        self.versioned(v, "spell", &s.image.full)
    }

    pub fn item_icon(&self, v: &Version, item: &Item) -> String {
        self.versioned(v, "item", &item.image.full)
    }

    pub fn map_icon(&self, v: &Version, m: &GameMap) -> String {
        let id = if m.map_id.is_empty() { FALLBACK_MAP_ID } else { m.map_id.as_str() };
        self.map_icon_by_id(v, id)
    }

    pub fn map_icon_by_id(&self, v: &Version, map_id: &str) -> String {
        self.versioned(v, "map", &format!("map{map_id}.png"))
    }

    /// Splash art is not versioned.
    pub fn skin_splash(&self, champion_id: &str, skin: &Skin) -> String {
        format!(
            "{}/cdn/img/champion/splash/{}_{}.jpg",
            self.base, champion_id, skin.num
        )
    }

    pub fn skin_loading(&self, champion_id: &str, skin: &Skin) -> String {
        format!(
            "{}/cdn/img/champion/loading/{}_{}.jpg",
            self.base, champion_id, skin.num
        )
    }

    /// Loading-screen art for the two maps that have one.
    pub fn map_loading(&self, m: &GameMap) -> Option<String> {
        let name = loading_art_name(m)?;
        Some(format!("{}/cdn/img/champion/loading/{name}_0.jpg", self.base))
    }

    /// Icon, loading-screen art where there is one, then the minimap.
    pub fn map_gallery(&self, v: &Version, m: &GameMap) -> Vec<MapImage> {
        let mut out = vec![MapImage {
            label: "Icon",
            url: self.map_icon(v, m),
        }];
        if let Some(url) = self.map_loading(m) {
            out.push(MapImage {
                label: "Loading Screen",
                url,
            });
        }
        out.push(MapImage {
            label: "Minimap",
            url: self.map_icon(v, m),
        });
        out
    }

    /// Rune icons carry their own relative path and are not versioned.
    pub fn rune_tree_icon(&self, tree: &RuneTree) -> String {
        format!("{}/cdn/img/{}", self.base, tree.icon)
    }

    pub fn rune_icon(&self, rune: &Rune) -> String {
        format!("{}/cdn/img/{}", self.base, rune.icon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageRef;

    fn v() -> Version {
        Version::from("14.1.1")
    }

    #[test]
    fn test_versioned_icons() {
        let urls = AssetUrls::default();
        let c = ChampionSummary {
            image: ImageRef { full: "Ahri.png".into(), ..Default::default() },
            ..Default::default()
        };
        assert_eq!(
            urls.champion_icon(&v(), &c),
            "https://ddragon.leagueoflegends.com/cdn/14.1.1/img/champion/Ahri.png"
        );
    }

    #[test]
    fn test_map_fallback_and_loading() {
        let urls = AssetUrls::new("http://cdn.test/");
        let unknown = GameMap::default();
        assert_eq!(urls.map_icon(&v(), &unknown), "http://cdn.test/cdn/14.1.1/img/map/map11.png");
        assert!(urls.map_loading(&unknown).is_none());

        let aram = GameMap { map_id: "12".into(), ..Default::default() };
        assert_eq!(
            urls.map_loading(&aram).as_deref(),
            Some("http://cdn.test/cdn/img/champion/loading/HowlingAbyss_0.jpg")
        );
    }

    #[test]
    fn test_map_gallery() {
        let urls = AssetUrls::default();
        let rift = GameMap { map_id: "11".into(), ..Default::default() };
        let labels: Vec<_> = urls.map_gallery(&v(), &rift).iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["Icon", "Loading Screen", "Minimap"]);
        assert_eq!(map_gallery_len(&rift), 3);

        let arena = GameMap { map_id: "30".into(), ..Default::default() };
        assert_eq!(urls.map_gallery(&v(), &arena).len(), map_gallery_len(&arena));
        assert_eq!(map_gallery_len(&arena), 2);
    }

    #[test]
    fn test_skin_and_rune_paths() {
        let urls = AssetUrls::default();
        let skin = Skin { num: 7, ..Default::default() };
        assert!(urls.skin_splash("Ahri", &skin).ends_with("/cdn/img/champion/splash/Ahri_7.jpg"));
        let tree = RuneTree { icon: "perk-images/Styles/7200_Domination.png".into(), ..Default::default() };
        assert!(urls.rune_tree_icon(&tree).ends_with("/cdn/img/perk-images/Styles/7200_Domination.png"));
    }
}
