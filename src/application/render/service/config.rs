use comrak::options::Options;

/// Comrak options for authored articles: GitHub-flavoured extensions, raw
/// HTML passed through to the lowering stage, and soft line breaks rendered
/// as `<br />`.
pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    // Raw HTML is filtered by the sanitizer on the parsed tree instead.
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.hardbreaks = true;
    render.r#unsafe = true;
    render.github_pre_lang = false;
    render.full_info_string = false;
    render.sourcepos = false;
}
