//! Page templates, embedded in the binary.

use tera::{Context, Tera};

/// Build the template engine with every page registered.
pub fn build() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", BASE_TEMPLATE),
        ("home.html", HOME_TEMPLATE),
        ("upload.html", UPLOAD_TEMPLATE),
        ("watch.html", WATCH_TEMPLATE),
    ])?;
    Ok(tera)
}

pub fn render(tera: &Tera, template: &str, context: &Context) -> Result<String, tera::Error> {
    tera.render(template, context)
}

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Video Streamer</title>
    <style>
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            background: #f2f2f2;
            margin: 0;
            padding: 0;
        }
        header {
            background-color: #4CAF50;
            padding: 20px;
            text-align: center;
            color: white;
        }
        main {
            max-width: 900px;
            margin: 20px auto;
            background: white;
            padding: 20px;
            border-radius: 8px;
        }
        a { text-decoration: none; color: #4CAF50; }
        a:hover { text-decoration: underline; }
        .video-list {
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(250px, 1fr));
            gap: 20px;
            margin-top: 20px;
        }
        .video-card {
            border: 1px solid #ccc;
            padding: 10px;
            background-color: #fafafa;
            border-radius: 6px;
        }
        .upload-btn {
            display: inline-block;
            background-color: #4CAF50;
            color: white;
            padding: 10px 15px;
            margin-bottom: 10px;
            border-radius: 4px;
        }
    </style>
</head>
<body>
    <header><h1>Video Streamer</h1></header>
    <main>
        {% block content %}{% endblock content %}
    </main>
</body>
</html>"##;

const HOME_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block content %}
<a href="/upload" class="upload-btn">Upload New Video</a>
<div class="video-list">
    {% for video in videos %}
    <div class="video-card">
        <h3>{{ video.title }}</h3>
        <video width="100%" controls>
            <source src="{{ video.url }}" type="{{ video.content_type }}">
            Your browser does not support the video tag.
        </video>
        <p><a href="/watch/{{ video.id }}">Watch Fullscreen</a></p>
    </div>
    {% endfor %}
    {% if videos | length == 0 %}
    <p>No videos uploaded yet.</p>
    {% endif %}
</div>
{% endblock content %}"##;

const UPLOAD_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block content %}
<h2>Upload a New Video</h2>
<form method="post" action="/upload" enctype="multipart/form-data">
    <p>Title: <input type="text" name="title" required></p>
    <p>Video File: <input type="file" name="file" accept="{{ accept }}" required></p>
    <button type="submit">Upload</button>
</form>
{% endblock content %}"##;

const WATCH_TEMPLATE: &str = r##"{% extends "base.html" %}
{% block content %}
<h2>{{ video.title }}</h2>
<video width="100%" controls autoplay>
    <source src="{{ video.url }}" type="{{ video.content_type }}">
    Your browser does not support the video tag.
</video>
<p><a href="/">Back to videos</a></p>
{% endblock content %}"##;
