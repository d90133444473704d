use bakery::filters::{DashFilter, ManifestFilter};
use bakery::url_parse;
use dash_mpd::MPD;
use url::Url;

const MANIFEST: &str = include_str!("fixtures/dash/manifest.mpd");

fn manifest_url() -> Url {
    Url::parse("https://h/path/manifest.mpd").unwrap()
}

fn filter(path: &str) -> anyhow::Result<String> {
    let (_, filters) = url_parse(path)?;
    let url = manifest_url();
    Ok(DashFilter::new(&url, MANIFEST).filter_manifest(&filters)?)
}

fn parse(manifest: &str) -> MPD {
    dash_mpd::parse(manifest).unwrap()
}

fn representation_ids(mpd: &MPD) -> Vec<String> {
    mpd.periods
        .iter()
        .flat_map(|p| &p.adaptations)
        .flat_map(|a| &a.representations)
        .filter_map(|r| r.id.clone())
        .collect()
}

#[test]
fn no_filters_preserve_every_representation() -> anyhow::Result<()> {
    let out = filter("/manifest.mpd")?;
    let mpd = parse(&out);

    assert_eq!(representation_ids(&mpd), vec!["v1", "v2", "a1", "a2", "t1"]);
    Ok(())
}

#[test]
fn base_urls_are_rewritten_to_absolute() -> anyhow::Result<()> {
    let out = filter("/manifest.mpd")?;
    let mpd = parse(&out);

    let representation = &mpd.periods[0].adaptations[0].representations[0];
    assert_eq!(
        representation.BaseURL[0].base,
        "https://h/path/video/1m/"
    );
    Ok(())
}

#[test]
fn stream_type_filters_drop_whole_adaptation_sets() -> anyhow::Result<()> {
    let out = filter("/fs(audio)/manifest.mpd")?;
    let mpd = parse(&out);

    assert_eq!(representation_ids(&mpd), vec!["v1", "v2", "t1"]);

    let out = filter("/fs(text)/manifest.mpd")?;
    let mpd = parse(&out);

    assert_eq!(representation_ids(&mpd), vec!["v1", "v2", "a1", "a2"]);
    Ok(())
}

#[test]
fn bandwidth_windows_apply_per_family() -> anyhow::Result<()> {
    let out = filter("/v(b(,2000000))/manifest.mpd")?;
    let mpd = parse(&out);

    // Only the 4 Mb/s video representation falls outside the video window.
    assert_eq!(representation_ids(&mpd), vec!["v1", "a1", "a2", "t1"]);
    Ok(())
}

#[test]
fn overall_bandwidth_window_applies_to_text_tracks() -> anyhow::Result<()> {
    let out = filter("/b(100000,2000000)/manifest.mpd")?;
    let mpd = parse(&out);

    // v2 exceeds the window; t1 sits below the overall minimum.
    assert_eq!(representation_ids(&mpd), vec!["v1", "a1", "a2"]);
    Ok(())
}

#[test]
fn audio_codec_filters_remove_matching_representations() -> anyhow::Result<()> {
    let out = filter("/a(ec-3)/manifest.mpd")?;
    let mpd = parse(&out);

    assert_eq!(representation_ids(&mpd), vec!["v1", "v2", "a1", "t1"]);
    Ok(())
}

#[test]
fn video_codec_filters_remove_matching_representations() -> anyhow::Result<()> {
    let out = filter("/v(hvc)/manifest.mpd")?;
    let mpd = parse(&out);

    assert_eq!(representation_ids(&mpd), vec!["v1", "a1", "a2", "t1"]);
    Ok(())
}

#[test]
fn audio_language_filters_remove_matching_tracks() -> anyhow::Result<()> {
    let out = filter("/al(en)/manifest.mpd")?;
    let mpd = parse(&out);

    assert_eq!(representation_ids(&mpd), vec!["v1", "v2", "t1"]);
    Ok(())
}

#[test]
fn caption_language_filters_remove_matching_tracks() -> anyhow::Result<()> {
    let out = filter("/c(pt-BR)/manifest.mpd")?;
    let mpd = parse(&out);

    assert_eq!(representation_ids(&mpd), vec!["v1", "v2", "a1", "a2"]);
    Ok(())
}

#[test]
fn caption_type_filters_remove_matching_tracks() -> anyhow::Result<()> {
    let out = filter("/ct(stpp)/manifest.mpd")?;
    let mpd = parse(&out);

    assert_eq!(representation_ids(&mpd), vec!["v1", "v2", "a1", "a2"]);
    Ok(())
}

#[test]
fn empty_adaptation_sets_and_periods_are_pruned() -> anyhow::Result<()> {
    let out = filter("/fs(audio,video,text)/manifest.mpd")?;
    let mpd = parse(&out);

    assert!(mpd.periods.is_empty());
    Ok(())
}

#[test]
fn trim_is_rejected_for_dash() {
    let result = filter("/t(100,1000)/manifest.mpd");
    assert!(result.is_err());
}
